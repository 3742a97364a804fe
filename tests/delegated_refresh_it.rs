#![cfg(feature = "test")]

// std
use std::time::Duration as StdDuration;
// self
use forge_api_client::{
	_preludet::*,
	auth::{ClientCredentials, ScopeSet, Token},
	client::{ApiRequest, Client, RequestContext},
	flows::DelegatedUserAuth,
};

const CALLERS: usize = 8;

fn expired_token() -> Token {
	let issued_at = OffsetDateTime::now_utc() - Duration::hours(2);

	Token::builder()
		.access_token("stale")
		.refresh_token("refresh-stale")
		.issued_at(issued_at)
		.expires_in(Duration::hours(1))
		.build()
		.expect("Expired token fixture should build.")
}

fn routing_transport() -> Arc<FakeTransport> {
	let transport = FakeTransport::new(|request| {
		if request.path().ends_with("/authentication/v1/refreshtoken") {
			json_response(200, &token_body("fresh"))
		} else {
			json_response(200, r#"{"data":[]}"#)
		}
	});

	Arc::new(transport.with_delay(StdDuration::from_millis(50)))
}

fn delegated(transport: Arc<FakeTransport>, granted: ScopeSet) -> DelegatedUserAuth {
	DelegatedUserAuth::with_transport(
		ClientCredentials::new("client-id", "client-secret"),
		test_endpoints("https://forge.test"),
		transport,
		Url::parse("https://app.test/callback").expect("Redirect URI should parse."),
		granted,
	)
	.expect("Delegated provider should build.")
	.with_token(expired_token())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_refresh() {
	let transport = routing_transport();
	let auth = Arc::new(delegated(transport.clone(), ScopeSet::DATA_READ));
	let client = Arc::new(Client::new(auth.clone(), transport.clone()));
	let mut handles = Vec::with_capacity(CALLERS);

	for _ in 0..CALLERS {
		let client = client.clone();

		handles.push(tokio::spawn(async move {
			let request = ApiRequest::get(ScopeSet::DATA_READ, "project/v1/hubs");

			client.execute_empty(&request, &RequestContext::new()).await
		}));
	}
	for handle in handles {
		handle.await.expect("Caller task should not panic.").expect("Caller should succeed.");
	}

	let requests = transport.requests();
	let refreshes =
		requests.iter().filter(|r| r.path().ends_with("/authentication/v1/refreshtoken")).count();
	let api_calls =
		requests.iter().filter(|r| r.path().ends_with("/project/v1/hubs")).collect::<Vec<_>>();

	assert_eq!(refreshes, 1);
	assert_eq!(auth.refresh_metrics().attempts(), 1);
	assert_eq!(api_calls.len(), CALLERS);
	assert!(api_calls.iter().all(|r| r.headers["authorization"] == "Bearer fresh"));
	assert_eq!(
		auth.current_token().expect("Refreshed token should be held.").access_token.expose(),
		"fresh"
	);
}

#[tokio::test]
async fn scopes_outside_the_grant_fail_before_any_exchange() {
	let transport = routing_transport();
	let auth = delegated(transport.clone(), ScopeSet::DATA_READ);
	let client = Client::new(auth, transport.clone());
	let request = ApiRequest::post(ScopeSet::DATA_WRITE, "oss/v2/buckets");
	let err = client
		.execute_empty(&request, &RequestContext::new())
		.await
		.expect_err("Scope outside the grant should be denied.");

	assert!(matches!(
		err,
		Error::ScopeDenied { required, granted }
			if required == ScopeSet::DATA_WRITE && granted == ScopeSet::DATA_READ
	));
	assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn refresh_keeps_the_previous_refresh_token_when_none_is_returned() {
	let transport = Arc::new(FakeTransport::scripted([json_response(
		200,
		r#"{"access_token":"fresh","token_type":"Bearer","expires_in":3600}"#,
	)]));
	let auth = delegated(transport.clone(), ScopeSet::DATA_READ);

	auth.refresh_if_expired().await.expect("Refresh should succeed.");

	let token = auth.current_token().expect("Refreshed token should be held.");

	assert_eq!(token.access_token.expose(), "fresh");
	assert_eq!(
		token.refresh_token.as_ref().map(|secret| secret.expose()),
		Some("refresh-stale")
	);
	assert!(transport.requests()[0].body_text().contains("grant_type=refresh_token"));
}
