//! Reads bucket details with a service-identity token, against a local mock of the Forge
//! authentication and bucket services so it runs without real credentials.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use forge_api_client::{
	auth::ClientCredentials,
	client::{Client, RequestContext},
	config::ServiceEndpoints,
	flows::ServiceIdentityAuth,
	oss::BucketApi,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/authentication/v1/authenticate");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":3599}",
			);
		})
		.await;
	let bucket_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/oss/v2/buckets/demo-bucket/details")
				.header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(
				"{\"bucketKey\":\"demo-bucket\",\"bucketOwner\":\"demo-app\",\"createDate\":1463785700000,\"permissions\":[{\"authId\":\"demo-app\",\"access\":\"full\"}],\"policyKey\":\"transient\"}",
			);
		})
		.await;
	let endpoints = ServiceEndpoints::builder()
		.host(Url::parse(&server.base_url())?)
		.allow_insecure_host(true)
		.build()?;
	let credentials = ClientCredentials::from_env()
		.unwrap_or_else(|_| ClientCredentials::new("demo-client", "demo-secret"));
	let auth = ServiceIdentityAuth::new(credentials, endpoints).with_token_cache(true);
	let api = BucketApi::new(Arc::new(Client::with_reqwest(auth)));
	let details = api.bucket_details("demo-bucket", &RequestContext::new()).await?;

	println!("bucket `{}` owned by `{}`", details.bucket_key, details.bucket_owner);
	println!("policy: {}", details.policy_key);

	for permission in &details.permissions {
		println!("  {} -> {}", permission.auth_id, permission.access);
	}

	token_mock.assert_async().await;
	bucket_mock.assert_async().await;

	Ok(())
}
