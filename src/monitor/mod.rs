pub mod aci_client;
pub mod domains;
pub mod fabric_collector;
pub mod queries;
