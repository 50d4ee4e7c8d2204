//! Shared fixture: the mock server on an ephemeral port.

use rest_core::Client;

/// Start the mock server on a background runtime and return its base URL.
pub fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

/// A default client pointed at a fresh mock server.
pub fn client() -> Client {
    let mut client = Client::new();
    client.set_host_url(&start_server());
    client
}
