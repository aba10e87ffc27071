use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mirrorpane::holiday::{HolidaySource, Tallyfy};
use mirrorpane::http;
use mirrorpane::location::FALLBACK_POSITION;
use mirrorpane::weather::{OpenMeteo, WeatherSource};
use mirrorpane::Error;

fn client() -> reqwest::Client {
    http::client(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn ok_answers_are_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .and(query_param("city", "Seoul"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{ "open": true }"#))
        .mount(&server)
        .await;

    let url = format!("{}/status", server.uri());
    let body = http::get_json(&client(), &url, &[("city", "Seoul".to_string())])
        .await
        .unwrap();
    assert_eq!(body["open"].as_bool(), Some(true));
}

#[tokio::test]
async fn non_ok_answers_are_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("{}"))
        .mount(&server)
        .await;

    let url = format!("{}/status", server.uri());
    match http::get_json(&client(), &url, &[]).await {
        Err(Error::Status { url: failed, status }) => {
            assert_eq!(status, 503);
            assert_eq!(failed, url);
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn bad_bodies_are_json_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let url = format!("{}/status", server.uri());
    assert!(matches!(
        http::get_json(&client(), &url, &[]).await,
        Err(Error::Json(_))
    ));
}

#[tokio::test]
async fn missing_holiday_year_is_an_error_not_an_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/KR/2024.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{ "year": 2024, "holidays": [
                { "date": "2024-03-01", "name": "Independence Movement Day", "local_name": "삼일절" }
            ] }"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/KR/2025.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tallyfy = Tallyfy::new(client(), format!("{}/", server.uri()));

    let this_year = tallyfy.holidays("KR", 2024).await.unwrap();
    assert_eq!(this_year.len(), 1);
    assert_eq!(this_year[0].name, "삼일절");

    assert!(matches!(
        tallyfy.holidays("KR", 2025).await,
        Err(Error::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn air_quality_sends_the_position() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/air-quality"))
        .and(query_param("latitude", FALLBACK_POSITION.latitude.to_string()))
        .and(query_param("longitude", FALLBACK_POSITION.longitude.to_string()))
        .and(query_param("current", "pm10,pm2_5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{ "current": { "pm10": 31.4, "pm2_5": 12.9 } }"#),
        )
        .mount(&server)
        .await;

    let source = OpenMeteo::new(
        client(),
        format!("{}/v1/forecast", server.uri()),
        format!("{}/v1/air-quality", server.uri()),
    );

    let reading = source.air_quality(FALLBACK_POSITION).await.unwrap();
    assert_eq!((reading.pm10, reading.pm2_5), (31.4, 12.9));
}
