mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use marklin_server::interface_adapters::protocol::{
    ClientMessage, ServerMessage, SetTrainSpeedDto, TickPayloadDto,
};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// Read tick payloads until one satisfies the predicate, with an overall cap
// so a broken stream fails the test instead of hanging it.
async fn wait_for_payload(
    socket: &mut WsStream,
    what: &str,
    predicate: impl Fn(&TickPayloadDto) -> bool,
) -> TickPayloadDto {
    for _ in 0..200 {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
            .expect("stream ended")
            .expect("websocket error");

        if let Message::Text(text) = msg {
            let ServerMessage::Tick(payload) =
                serde_json::from_str(text.as_str()).expect("parse server message");
            if predicate(&payload) {
                return payload;
            }
        }
    }
    panic!("gave up waiting for {what}");
}

#[tokio::test]
async fn connection_gets_a_full_sync_then_deltas_for_commands() {
    let base_url = support::ensure_server();
    let host = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    let (mut socket, _response) = tokio_tungstenite::connect_async(format!("ws://{host}/ws"))
        .await
        .expect("ws connect");

    // Bootstrap: a full payload with the whole topology arrives first.
    let full = wait_for_payload(&mut socket, "full sync", |p| p.draw_track).await;
    assert_eq!(full.trains.len(), 2);
    assert!(!full.straight_tracks.as_ref().unwrap().is_empty());
    assert!(!full.bezier_tracks.as_ref().unwrap().is_empty());
    for train in &full.trains {
        assert!(train.position.is_some());
        assert!(train.speed.is_some());
        assert!(train.dimensions.is_some());
    }

    // Command a train; the following deltas must surface it.
    let command = ClientMessage::SetTrainSpeed(SetTrainSpeedDto {
        id: 1,
        speed: 80.0,
        light: true,
    });
    socket
        .send(Message::text(
            serde_json::to_string(&command).expect("serialize command"),
        ))
        .await
        .expect("send command");

    let delta = wait_for_payload(&mut socket, "delta with train 1", |p| {
        !p.draw_track && p.trains.iter().any(|t| t.id == 1)
    })
    .await;

    let train = delta.trains.iter().find(|t| t.id == 1).unwrap();
    // The light toggled and the train started moving; a delta never carries
    // full-only fields.
    assert!(train.position.is_some() || train.light == Some(true));
    assert!(train.speed.is_none());
    assert!(train.dimensions.is_none());

    socket.close(None).await.expect("close");
}
