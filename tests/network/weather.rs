use crate::mock::*;
use libcloudlink::config::WeatherConfig;
use libcloudlink::network::application::status::State;
use libcloudlink::network::application::weather::{Stage, WeatherClient};
use libcloudlink::network::tls::TlsPolicy;

const FORECAST: &[u8] = br#"{"cod":"200","message":0,"cnt":2,"list":[
    {"dt":1700000000,"main":{"temp":11.5,"feels_like":10.2,"humidity":76},"weather":[{"description":"overcast clouds","icon":"04n"}]},
    {"dt":1700010800,"main":{"temp":10.0,"feels_like":8.9,"humidity":80},"weather":[{"description":"light rain","icon":"10n"}]}],
    "city":{"name":"London","coord":{"lat":51.5074,"lon":-0.1278},"country":"GB"}}"#;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR tile";

fn client() -> WeatherClient<ToyTls> {
    WeatherClient::new(
        ToyTls::default(),
        TlsPolicy::default(),
        WeatherConfig {
            api_key: heapless::String::try_from("w1").unwrap(),
            ..WeatherConfig::default()
        },
    )
}

fn png_response() -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\n\r\n",
        PNG.len()
    )
    .into_bytes();
    response.extend_from_slice(PNG);
    response
}

#[test]
fn test_forecast_then_map_tile() {
    let mut stack = MockStack::cached();
    let mut client = client();

    client.fetch_forecast(&mut stack, "London");
    assert_eq!(client.state(), State::Receiving);
    assert_eq!(client.stage(), Stage::Forecast);
    assert_eq!(client.city(), "London");
    serve_secure(&mut stack, &ok_response(FORECAST), |s, e| client.drive(s, e));

    assert!(opened_request(&stack).starts_with(
        "GET /data/2.5/forecast?q=London&appid=w1&units=metric&cnt=16 HTTP/1.1\r\nHost: api.openweathermap.org\r\n"
    ));
    let forecast = client.forecast();
    assert_eq!(forecast.forecasts.len(), 2);
    assert_eq!(forecast.forecasts[0].description.as_str(), "overcast clouds");
    assert_eq!(forecast.forecasts[1].timestamp, 1_700_010_800);
    assert_eq!(forecast.forecasts[1].humidity, 80);

    // The map request follows on its own connection without leaving the active state.
    assert_eq!(client.state(), State::Receiving);
    assert_eq!(client.stage(), Stage::Map);
    assert_eq!(stack.lookups, ["api.openweathermap.org", "tile.openweathermap.org"]);
    assert_eq!(stack.connects.len(), 2);
    assert!(client.map_image().is_none());

    stack.written.clear();
    serve_secure(&mut stack, &png_response(), |s, e| client.drive(s, e));
    assert!(opened_request(&stack).starts_with("GET /map/temp_new/5/15/10.png?appid=w1 HTTP/1.1\r\n"));
    assert_eq!(client.state(), State::Success);
    assert_eq!(client.map_image(), Some(PNG));
    assert_eq!(client.forecast().forecasts.len(), 2);
}

#[test]
fn test_city_name_is_encoded() {
    let mut stack = MockStack::cached();
    let mut client = client();

    client.fetch_forecast(&mut stack, "New York");
    let conn = stack.last_conn();
    client.drive(&mut stack, libcloudlink::network::Event::Connected(conn));
    client.drive(&mut stack, libcloudlink::network::Event::DataArrived(conn, SERVER_HELLO));
    assert!(opened_request(&stack).starts_with("GET /data/2.5/forecast?q=New+York&appid=w1"));
}

#[test]
fn test_forecast_without_coordinates_skips_map() {
    let mut stack = MockStack::cached();
    let mut client = client();

    client.fetch_forecast(&mut stack, "Nowhere");
    let body = br#"{"list":[{"dt":1,"main":{"temp":3.0}}]}"#;
    serve_secure(&mut stack, &ok_response(body), |s, e| client.drive(s, e));

    assert_eq!(client.state(), State::Success);
    assert_eq!(stack.connects.len(), 1);
    assert!(client.map_image().is_none());
}

#[test]
fn test_city_not_found() {
    let mut stack = MockStack::cached();
    let mut client = client();

    client.fetch_forecast(&mut stack, "Atlantis");
    let body = br#"{"cod":"404","message":"city not found"}"#;
    serve_secure(&mut stack, &ok_response(body), |s, e| client.drive(s, e));

    assert_eq!(client.state(), State::Error);
    assert_eq!(client.status().message(), "city not found");
    assert_eq!(stack.connects.len(), 1);
}

#[test]
fn test_non_png_map_body_still_succeeds_without_image() {
    let mut stack = MockStack::cached();
    let mut client = client();

    client.fetch_map(&mut stack, 51.5074, -0.1278);
    assert_eq!(client.stage(), Stage::Map);
    assert_eq!(stack.lookups, ["tile.openweathermap.org"]);
    serve_secure(&mut stack, &ok_response(b"{\"message\":\"tile error\"}"), |s, e| {
        client.drive(s, e)
    });

    assert_eq!(client.state(), State::Success);
    assert!(client.map_image().is_none());
}

#[test]
fn test_fetch_while_busy_is_ignored() {
    let mut stack = MockStack::new();
    let mut client = client();

    client.fetch_forecast(&mut stack, "Paris");
    client.fetch_forecast(&mut stack, "Tokyo");
    client.fetch_map(&mut stack, 0.0, 0.0);
    assert_eq!(stack.lookups.len(), 1);
    assert_eq!(client.city(), "Paris");
}

#[test]
fn test_forecast_reads_the_same_twice() {
    let mut stack = MockStack::cached();
    let mut client = client();

    client.fetch_forecast(&mut stack, "Nowhere");
    let body = br#"{"list":[{"dt":1,"main":{"temp":3.0,"humidity":40}}]}"#;
    serve_secure(&mut stack, &ok_response(body), |s, e| client.drive(s, e));
    assert_eq!(client.state(), State::Success);

    let first = client.forecast().clone();
    assert_eq!(client.forecast(), &first);
    assert_eq!(first.forecasts[0].humidity, 40);
}
