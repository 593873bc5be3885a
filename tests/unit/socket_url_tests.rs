//! Unit tests for the connect-time URL transform.

use remote_console::transport::socket_url;
use remote_console::AppError;

#[test]
fn http_becomes_ws_with_socketio_path_and_query() {
    let url = socket_url("http://localhost:5001").expect("valid url");
    assert_eq!(
        url.as_str(),
        "ws://localhost:5001/socket.io/?EIO=4&transport=websocket"
    );
}

#[test]
fn https_becomes_wss() {
    let url = socket_url("https://console.example.com").expect("valid url");
    assert_eq!(url.scheme(), "wss");
    assert_eq!(url.host_str(), Some("console.example.com"));
    assert_eq!(url.path(), "/socket.io/");
}

#[test]
fn existing_path_is_replaced() {
    let url = socket_url("http://host:8080/some/page").expect("valid url");
    assert_eq!(url.path(), "/socket.io/");
}

#[test]
fn existing_protocol_params_are_overridden_and_others_kept() {
    let url = socket_url("http://host/?EIO=3&token=abc&transport=polling").expect("valid url");
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    assert_eq!(
        pairs,
        vec![
            ("token".to_owned(), "abc".to_owned()),
            ("EIO".to_owned(), "4".to_owned()),
            ("transport".to_owned(), "websocket".to_owned()),
        ]
    );
}

#[test]
fn ws_schemes_are_accepted_as_is() {
    assert_eq!(socket_url("ws://h").expect("ws").scheme(), "ws");
    assert_eq!(socket_url("wss://h").expect("wss").scheme(), "wss");
}

#[test]
fn other_schemes_are_rejected() {
    assert!(matches!(
        socket_url("ftp://host"),
        Err(AppError::Config(_))
    ));
    assert!(matches!(socket_url("::"), Err(AppError::Config(_))));
}
