use std::time::Duration;

use taskpush::auth::{CallbackListener, RedirectTarget};

fn loopback_target() -> RedirectTarget {
    RedirectTarget {
        host: "127.0.0.1".into(),
        port: 0,
        path: "/callback".into(),
    }
}

#[tokio::test]
async fn accepts_exactly_one_callback() {
    let listener = CallbackListener::bind(&loopback_target()).await.unwrap();
    let base = format!("http://{}", listener.local_addr());
    let client = reqwest::Client::new();

    let missing = client.get(format!("{base}/callback")).send().await.unwrap();
    assert_eq!(missing.status().as_u16(), 400);

    let elsewhere = client
        .get(format!("{base}/favicon.ico"))
        .send()
        .await
        .unwrap();
    assert_eq!(elsewhere.status().as_u16(), 404);

    let first = client
        .get(format!("{base}/callback?code=c1&state=s1"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);
    assert!(first.text().await.unwrap().contains("Authorization received"));

    let second = client
        .get(format!("{base}/callback?code=c2&state=s2"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 410);

    let params = listener.wait(Duration::from_secs(1)).await.unwrap();
    assert_eq!(params.code.as_deref(), Some("c1"));
    assert_eq!(params.state.as_deref(), Some("s1"));
}

#[tokio::test]
async fn oauth_error_is_delivered() {
    let listener = CallbackListener::bind(&loopback_target()).await.unwrap();
    let url = format!(
        "http://{}/callback?error=access_denied&error_description=nope&state=s",
        listener.local_addr()
    );

    let response = reqwest::get(url).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let params = listener.wait(Duration::from_secs(1)).await.unwrap();
    assert_eq!(params.error.as_deref(), Some("access_denied"));
    assert_eq!(params.error_description.as_deref(), Some("nope"));
    assert!(params.code.is_none());
}

#[tokio::test]
async fn port_is_released_after_delivery() {
    let listener = CallbackListener::bind(&loopback_target()).await.unwrap();
    let addr = listener.local_addr();
    reqwest::get(format!("http://{addr}/callback?code=c&state=s"))
        .await
        .unwrap();

    listener.wait(Duration::from_secs(1)).await.unwrap();

    std::net::TcpListener::bind(addr).expect("port should be free");
}
