use reqwest::header::{AUTHORIZATION, HeaderName};
use serde_json::{Map, Value};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		rift_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn forwards_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-tenant".to_string(), Value::String("docs".to_string()));

	let headers =
		rift_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");
	let value =
		headers.get(HeaderName::from_static("x-tenant")).expect("Missing default header.");

	assert_eq!(value, "docs");
}

#[test]
fn rejects_non_string_default_header() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	assert!(rift_providers::auth_headers("secret", &defaults).is_err());
}
