//! Walks through delegated-user consent against the production Forge services.
//!
//! Requires `FORGE_CLIENT_ID`, `FORGE_CLIENT_SECRET`, and `FORGE_REDIRECT_URI` (the callback
//! registered for the app). Open the printed URL, approve, then paste the `code` query
//! parameter from the redirect.

// std
use std::{io, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::eyre};
use url::Url;
// self
use forge_api_client::{
	auth::{ClientCredentials, ScopeSet},
	client::{Client, RequestContext},
	config::ServiceEndpoints,
	dm::HubApi,
	flows::{self, DelegatedUserAuth},
	profile::ProfileApi,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let redirect_uri = std::env::var("FORGE_REDIRECT_URI")
		.map_err(|_| eyre!("FORGE_REDIRECT_URI must name the registered callback"))?;
	let auth = DelegatedUserAuth::new(
		ClientCredentials::from_env()?,
		ServiceEndpoints::production()?,
		Url::parse(&redirect_uri)?,
		ScopeSet::USER_PROFILE_READ | ScopeSet::DATA_READ,
	)?;
	let state = flows::generate_state();

	println!("open this URL and approve access:\n{}", auth.authorization_url(&state)?);
	println!("paste the `code` from the redirect:");

	let mut code = String::new();

	io::stdin().read_line(&mut code)?;
	auth.exchange_code(code.trim()).await?;

	let client = Arc::new(Client::with_reqwest(auth));
	let ctx = RequestContext::new().with_timeout(std::time::Duration::from_secs(30));
	let me = ProfileApi::new(client.clone()).about_me(&ctx).await?;

	println!("signed in as {} {} <{}>", me.first_name, me.last_name, me.email);

	let hubs = HubApi::new(client).hubs(None, &ctx).await?;

	for hub in &hubs.data {
		println!("hub {} ({})", hub.attribute_str("name").unwrap_or("unnamed"), hub.id);
	}

	Ok(())
}
