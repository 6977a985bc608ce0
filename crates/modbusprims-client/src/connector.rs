use modbusprims_transport::{ConnectionParams, Transport};

use crate::client::ModbusClient;
use crate::config::ClientConfig;
use crate::error::{ModbusError, Result};

/// Client over whichever transport the connection parameters name.
pub type DynClient = ModbusClient<Box<dyn Transport>>;

/// Open and connect a client with defaults matched to the transport kind.
pub fn connect(params: ConnectionParams) -> Result<DynClient> {
    let config = ClientConfig::for_connection(&params);
    connect_with_config(params, config)
}

/// Open and connect a client with explicit transaction policy.
pub fn connect_with_config(params: ConnectionParams, config: ClientConfig) -> Result<DynClient> {
    let transport = modbusprims_transport::open(params).map_err(ModbusError::Connect)?;
    let mut client = ModbusClient::new(transport, config);
    client.connect()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    use bytes::BytesMut;
    use modbusprims_frame::{encode_frame, function, Direction, Frame, FrameReader, FramingMode};

    use super::*;
    use crate::client::ConnectionState;

    fn answer_one_read(stream: TcpStream) {
        let mut writer = stream.try_clone().unwrap();
        let mut reader = FrameReader::new(stream, FramingMode::Socket, Direction::Request);
        let request = reader.read_frame().unwrap();
        assert_eq!(request.function, function::READ_COILS);

        let reply = Frame::new(request.unit_id, function::READ_COILS, vec![0x01, 0x01])
            .with_transaction_id(request.transaction_id.unwrap());
        let mut buf = BytesMut::new();
        encode_frame(FramingMode::Socket, &reply, &mut buf).unwrap();
        std::io::Write::write_all(&mut writer, &buf).unwrap();
    }

    #[test]
    fn connect_convenience_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let device = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            answer_one_read(stream);
        });

        let mut client = connect(ConnectionParams::tcp("127.0.0.1", port)).unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(client.transport().name(), "tcp");
        assert_eq!(client.read_coils(0, 1, 3).unwrap(), vec![true]);
        client.close();
        device.join().unwrap();
    }

    #[test]
    fn peer_hang_up_disconnects_and_reconnect_recovers() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let device = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = FrameReader::new(stream, FramingMode::Socket, Direction::Request);
            reader.read_frame().unwrap();
            drop(reader);

            let (stream, _) = listener.accept().unwrap();
            answer_one_read(stream);
        });

        let mut client = connect(ConnectionParams::tcp("127.0.0.1", port)).unwrap();
        assert!(matches!(
            client.read_coils(0, 1, 1),
            Err(ModbusError::EmptyResponse)
        ));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.transport().is_connected());

        client.connect().unwrap();
        assert_eq!(client.read_coils(0, 1, 1).unwrap(), vec![true]);
        client.close();
        device.join().unwrap();
    }

    #[test]
    fn connect_refused_is_connect_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let params = ConnectionParams::tcp("127.0.0.1", port)
            .with_connect_timeout(Duration::from_millis(200));
        let err = connect_with_config(params, ClientConfig::default()).unwrap_err();
        assert!(matches!(err, ModbusError::Connect(_)));
    }
}
