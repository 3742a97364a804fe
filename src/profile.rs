//! Profile of the end user behind a delegated-user credential.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	client::{ApiRequest, Client, RequestContext},
};

/// Default service prefix.
pub const DEFAULT_PROFILE_API_PATH: &str = "userprofile/v1";

/// Profile of the signed-in user.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
	/// Account id.
	pub user_id: String,
	/// Login name.
	pub user_name: String,
	/// Primary e-mail address.
	#[serde(rename = "emailId")]
	pub email: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Whether the e-mail address has been verified.
	pub email_verified: bool,
	/// Whether two-factor authentication is on.
	#[serde(rename = "2FaEnabled")]
	pub two_fa_enabled: bool,
	/// Avatar URLs keyed by size.
	pub profile_images: Value,
}

/// User profile endpoints; only meaningful with a delegated-user authenticator.
#[derive(Clone, Debug)]
pub struct ProfileApi {
	client: Arc<Client>,
	path: String,
}
impl ProfileApi {
	/// Creates the API on the default prefix.
	pub fn new(client: Arc<Client>) -> Self {
		Self { client, path: DEFAULT_PROFILE_API_PATH.into() }
	}

	/// Overrides the service prefix.
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();

		self
	}

	/// Reads the profile of the user who granted consent.
	pub async fn about_me(&self, ctx: &RequestContext) -> Result<UserProfile> {
		let request =
			ApiRequest::get(ScopeSet::USER_PROFILE_READ, &self.path).segments(["users", "@me"]);

		self.client.execute_json(&request, ctx).await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{FakeTransport, StaticAuth, json_response};

	#[tokio::test]
	async fn about_me_reads_the_current_user() {
		let transport = Arc::new(FakeTransport::scripted([json_response(
			200,
			r#"{
				"userId": "U1",
				"userName": "jdoe",
				"emailId": "jdoe@example.com",
				"firstName": "Jo",
				"lastName": "Doe",
				"emailVerified": true,
				"2FaEnabled": false,
				"profileImages": {"sizeX20": "https://cdn/20.png"}
			}"#,
		)]));
		let auth = Arc::new(StaticAuth::new("https://forge.test"));
		let api = ProfileApi::new(Arc::new(Client::new(auth.clone(), transport.clone())));
		let me = api.about_me(&RequestContext::new()).await.expect("Profile should decode.");

		assert_eq!(me.user_name, "jdoe");
		assert_eq!(me.email, "jdoe@example.com");
		assert!(me.email_verified);
		assert_eq!(me.profile_images["sizeX20"], "https://cdn/20.png");
		assert_eq!(auth.scopes(), vec![ScopeSet::USER_PROFILE_READ]);
		assert_eq!(transport.requests()[0].uri, "https://forge.test/userprofile/v1/users/@me");
	}
}
