#![cfg(feature = "test")]

// self
use forge_api_client::{
	_preludet::*,
	auth::{ClientCredentials, ScopeSet, TokenBuilderError},
	client::{Client, RequestContext},
	error::ConfigError,
	flows::ServiceIdentityAuth,
	oss::{BucketApi, BucketLimit, ListBucketsFilters},
};

const TOKEN_PATH: &str = "/authentication/v1/authenticate";

fn forge_transport() -> Arc<FakeTransport> {
	Arc::new(FakeTransport::new(|request| match request.path() {
		path if path.ends_with(TOKEN_PATH) => json_response(200, &token_body("abc")),
		path if path.ends_with("/oss/v2/buckets/k1/details") =>
			json_response(200, r#"{"bucketKey":"k1","bucketOwner":"o1","policyKey":"transient"}"#),
		path if path.ends_with("/oss/v2/buckets") =>
			json_response(200, r#"{"items":[{"bucketKey":"k1","policyKey":"transient"}]}"#),
		_ => json_response(404, r#"{"reason":"not found"}"#),
	}))
}

fn service_identity(transport: Arc<FakeTransport>) -> ServiceIdentityAuth {
	ServiceIdentityAuth::with_transport(
		ClientCredentials::new("client-id", "client-secret"),
		test_endpoints("https://forge.test"),
		transport,
	)
}

#[tokio::test]
async fn bucket_details_authenticate_then_call_the_service() {
	let transport = forge_transport();
	let client = Client::new(service_identity(transport.clone()), transport.clone());
	let api = BucketApi::new(Arc::new(client));
	let details = api
		.bucket_details("k1", &RequestContext::new())
		.await
		.expect("Bucket details should decode.");

	assert_eq!(details.bucket_key, "k1");
	assert_eq!(details.bucket_owner, "o1");

	let requests = transport.requests();

	assert_eq!(requests.len(), 2);
	assert!(requests[0].path().ends_with(TOKEN_PATH));
	assert!(requests[0].body_text().contains("grant_type=client_credentials"));
	assert!(requests[0].body_text().contains("scope=bucket%3Aread"));
	assert_eq!(requests[1].headers["authorization"], "Bearer abc");
}

#[tokio::test]
async fn every_call_exchanges_a_fresh_token_without_the_cache() {
	let transport = forge_transport();
	let client = Client::new(service_identity(transport.clone()), transport.clone());
	let api = BucketApi::new(Arc::new(client));
	let ctx = RequestContext::new();

	for _ in 0..2 {
		api.list_buckets(None, &ctx).await.expect("Listing should decode.");
	}

	let exchanges = transport.requests().iter().filter(|r| r.path().ends_with(TOKEN_PATH)).count();

	assert_eq!(exchanges, 2);
}

#[tokio::test]
async fn cached_tokens_are_reused_per_scope() {
	let transport = forge_transport();
	let auth = service_identity(transport.clone()).with_token_cache(true);
	let api = BucketApi::new(Arc::new(Client::new(auth, transport.clone())));
	let ctx = RequestContext::new();
	let filters = ListBucketsFilters { limit: BucketLimit(20), ..Default::default() };

	api.list_buckets(Some(&filters), &ctx).await.expect("Listing should decode.");
	api.bucket_details("k1", &ctx).await.expect("Bucket details should decode.");

	let exchanges = transport.requests().iter().filter(|r| r.path().ends_with(TOKEN_PATH)).count();

	assert_eq!(exchanges, 1);
}

#[tokio::test]
async fn user_id_is_forwarded_with_every_request() {
	let transport = forge_transport();
	let auth = service_identity(transport.clone())
		.with_user_id("user-42")
		.expect("User id should be a valid header value.");
	let api = BucketApi::new(Arc::new(Client::new(auth, transport.clone())));

	api.bucket_details("k1", &RequestContext::new()).await.expect("Bucket details should decode.");

	assert_eq!(transport.requests()[1].headers["x-user-id"], "user-42");
}

#[tokio::test]
async fn service_errors_keep_their_status() {
	let transport = forge_transport();
	let api = BucketApi::new(Arc::new(Client::new(
		service_identity(transport.clone()),
		transport.clone(),
	)));
	let err = api
		.bucket_details("missing", &RequestContext::new())
		.await
		.expect_err("Unknown bucket should fail.");

	assert!(err.api_error().is_some_and(|api| api.is_not_found()));
	assert!(!matches!(err, Error::Decode { .. }));
	assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn invalid_scopes_never_reach_the_network() {
	let transport = forge_transport();
	let auth = service_identity(transport.clone());
	let err = auth.authenticate(ScopeSet::EMPTY).await.expect_err("Empty scope should fail.");

	assert!(matches!(err, Error::InvalidScope { .. }));
	assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn unrepresentable_expiry_is_an_error() {
	let transport = Arc::new(FakeTransport::scripted([json_response(
		200,
		r#"{"access_token":"abc","token_type":"Bearer","expires_in":100000000000000}"#,
	)]));
	let auth = service_identity(transport.clone());
	let err = auth.authenticate(ScopeSet::DATA_READ).await.expect_err("Expiry should overflow.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::TokenBuilder(TokenBuilderError::ExpiryOutOfRange))
	));
	assert_eq!(transport.calls(), 1);
}
