pub mod rest;

pub use rest::{image_url, routes, ApiConfig, ApiState, RestApi, DEFAULT_TOP_K, IMAGES_ROUTE};
