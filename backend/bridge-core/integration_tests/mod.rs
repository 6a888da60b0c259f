mod bridge_tests {
    pub mod helpers;

    mod facade;
    mod preferences;
    mod subscriptions;
}

mod ipc_tests {
    pub mod helpers;

    mod websocket;
}
