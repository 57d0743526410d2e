pub mod backend_client;
