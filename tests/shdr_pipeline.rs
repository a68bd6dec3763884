//! End-to-end pipeline tests: SHDR lines over a real TCP socket in, typed
//! entities out of the public stream.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use shdrlink::{
    AssetCommand, ConnectorConfig, DataItem, Entity, SessionState, Shdr, StaticDictionary, Value,
};

async fn next_entity(stream: &mut shdrlink::ObservationStream) -> Entity {
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for an entity")
        .expect("entity stream ended")
}

#[tokio::test]
async fn lines_in_entities_out() {
    let _ = tracing_subscriber::fmt::try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dictionary = StaticDictionary::builder()
        .item(DataItem::sample("Xact"))
        .item(DataItem::event("alarmX").alarm())
        .build();

    let connection =
        Shdr::connect(ConnectorConfig::new("127.0.0.1", addr.port()), Arc::new(dictionary))
            .await
            .unwrap();
    let commands = connection.commands();
    let mut observations = connection.observations();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // the adapter announces itself with a ping
        let mut buf = [0u8; 64];
        let n = socket.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"* PING\n");

        socket.write_all(b"2021-01-19T12:00:00.123Z|Xact|3.14\n").await.unwrap();
        socket.write_all(b"alarmX|OVERTEMP||HIGH|ACTIVE|coolant too hot\n").await.unwrap();
        socket.write_all(b"@REMOVE_ASSET@|T-99\n").await.unwrap();
        socket
    });

    let first = next_entity(&mut observations).await;
    let observation = first.as_observation().unwrap();
    assert_eq!(observation.data_item_id, "Xact");
    assert_eq!(observation.value(), Some(&Value::Double(3.14)));
    assert_eq!(
        observation.timestamp.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
        "2021-01-19T12:00:00.123000Z"
    );

    let second = next_entity(&mut observations).await;
    let observation = second.as_observation().unwrap();
    assert_eq!(observation.properties.get("code"), Some(&Value::String("OVERTEMP".into())));
    assert_eq!(observation.properties.get("state"), Some(&Value::String("ACTIVE".into())));
    assert_eq!(observation.value(), Some(&Value::String("coolant too hot".into())));

    let third = next_entity(&mut observations).await;
    let Entity::Asset { command, .. } = third else { panic!("expected an asset command") };
    assert_eq!(command, AssetCommand::Remove { asset_id: "T-99".into() });

    // egress: a queued protocol command reaches the peer
    let mut socket = server.await.unwrap();
    commands.send("AVAIL").await.unwrap();
    let mut buf = [0u8; 64];
    let n = socket.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"* AVAIL\n");

    // dropping the stream cancels the connector; the peer sees EOF
    drop(observations);
    let mut rest = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), socket.read_to_end(&mut rest))
        .await
        .expect("peer never saw the connector close")
        .unwrap();
}

#[tokio::test]
async fn state_stream_reports_the_session_lifecycle() {
    let _ = tracing_subscriber::fmt::try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let connection = Shdr::connect(
        ConnectorConfig::new("127.0.0.1", addr.port()),
        Arc::new(StaticDictionary::builder().build()),
    )
    .await
    .unwrap();
    let mut states = Box::pin(connection.state_changes());

    let (socket, _) = listener.accept().await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let state = tokio::time::timeout_at(deadline, states.next())
            .await
            .expect("timed out waiting for Connected")
            .expect("state stream ended");
        if state == (SessionState::Connected { heartbeat: None }) {
            break;
        }
    }

    // closing the peer sends the session back to Disconnected before retrying
    drop(socket);
    loop {
        let state = tokio::time::timeout_at(deadline, states.next())
            .await
            .expect("timed out waiting for Disconnected")
            .expect("state stream ended");
        if state == SessionState::Disconnected {
            break;
        }
    }

    connection.shutdown();
}
