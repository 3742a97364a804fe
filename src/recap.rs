//! Reality capture: photo scenes that turn uploaded images into 3D results.
//!
//! The workflow is: create a scene, add images, start processing, poll progress, fetch results.
//! The service sometimes answers 200 with an `Error` member instead of a failure status; those
//! replies surface as [`Error::Scene`].

// crates.io
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserializer, de::DeserializeOwned};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	client::{self, ApiRequest, Client, RequestContext},
	filters::QueryParam,
};

/// Default service prefix.
pub const DEFAULT_RECAP_API_PATH: &str = "photo-to-3d/v1";

const BOUNDARY_LEN: usize = 30;

/// Failure reported inside a success response.
#[derive(Clone, Debug, PartialEq, Eq, ThisError, Serialize, Deserialize)]
#[error("Photo scene error {code}: {message}.")]
pub struct SceneError {
	/// Service error code.
	#[serde(deserialize_with = "code_text")]
	pub code: String,
	/// Service message.
	#[serde(rename = "msg")]
	pub message: String,
}

/// Capture setup of a scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneType {
	/// Turntable or walk-around capture of a single object.
	#[default]
	Object,
	/// Drone capture of a site.
	Aerial,
}
impl SceneType {
	/// Value sent as `scenetype`.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Object => "object",
			Self::Aerial => "aerial",
		}
	}
}
impl Display for SceneType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Scene identifier returned by creation and processing calls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoScene {
	/// Scene id.
	#[serde(rename = "photosceneid")]
	pub id: String,
}

/// Reply to an image upload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileUpload {
	/// Scene the files were added to.
	#[serde(rename = "photosceneid")]
	pub scene_id: String,
	/// Per-file results as reported by the service.
	#[serde(rename = "Files")]
	pub files: Value,
}

/// Reply to a processing request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingStarted {
	/// Scene being processed.
	#[serde(rename = "Photoscene")]
	pub scene: PhotoScene,
	/// Service message.
	pub msg: String,
}

/// Processing state of a scene.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneProgress {
	/// Scene id.
	#[serde(rename = "photosceneid")]
	pub scene_id: String,
	/// Human-readable state.
	#[serde(rename = "progressmsg")]
	pub message: String,
	/// Percentage as text, e.g. `"42"`.
	pub progress: String,
}

/// Download information for a processed scene.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneResult {
	/// Scene id.
	#[serde(rename = "photosceneid")]
	pub scene_id: String,
	/// Human-readable state.
	#[serde(rename = "progressmsg")]
	pub message: String,
	/// Percentage as text.
	pub progress: String,
	/// Time-limited download link; stays valid after the scene is deleted.
	#[serde(rename = "scenelink")]
	pub link: String,
	/// Result size in bytes, as text.
	#[serde(rename = "filesize")]
	pub file_size: String,
}

#[derive(Debug, Deserialize)]
struct SceneEnvelope<T> {
	#[serde(rename = "Photoscene")]
	scene: T,
}

/// Reality capture endpoints.
#[derive(Clone, Debug)]
pub struct RecapApi {
	client: Arc<Client>,
	path: String,
}
impl RecapApi {
	/// Creates the API on the default prefix.
	pub fn new(client: Arc<Client>) -> Self {
		Self { client, path: DEFAULT_RECAP_API_PATH.into() }
	}

	/// Overrides the service prefix.
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();

		self
	}

	/// Shared executor.
	pub fn client(&self) -> &Arc<Client> {
		&self.client
	}

	/// Creates a scene named `name` producing `formats` (e.g. `rcm`, `rcs`, `obj`, `ortho`,
	/// `report`).
	pub async fn create_photo_scene(
		&self,
		name: &str,
		formats: &[&str],
		scene_type: SceneType,
		ctx: &RequestContext,
	) -> Result<PhotoScene> {
		let formats = formats.join(",");
		let request =
			ApiRequest::post(ScopeSet::DATA_WRITE, &self.path).segment("photoscene").form([
				("scenename", name),
				("format", formats.as_str()),
				("scenetype", scene_type.as_str()),
			]);
		let envelope: SceneEnvelope<PhotoScene> = self.call(&request, ctx).await?;

		Ok(envelope.scene)
	}

	/// Adds an image the service downloads from `link`.
	pub async fn add_file_by_link(
		&self,
		scene_id: &str,
		link: &str,
		ctx: &RequestContext,
	) -> Result<FileUpload> {
		let mut form = Multipart::new();

		form.text("photosceneid", scene_id);
		form.text("type", "image");
		form.text("file[0]", link);

		self.upload(form, ctx).await
	}

	/// Uploads an image from memory.
	pub async fn add_file_by_data(
		&self,
		scene_id: &str,
		data: &[u8],
		ctx: &RequestContext,
	) -> Result<FileUpload> {
		let mut form = Multipart::new();
		let file_name = format!("data{}", rand::rng().random::<u32>());

		form.text("photosceneid", scene_id);
		form.text("type", "image");
		form.file("file[0]", &file_name, data);

		self.upload(form, ctx).await
	}

	/// Starts processing; it can be cancelled at any time.
	pub async fn start_processing(
		&self,
		scene_id: &str,
		ctx: &RequestContext,
	) -> Result<ProcessingStarted> {
		let request =
			ApiRequest::post(ScopeSet::DATA_WRITE, &self.path).segments(["photoscene", scene_id]);

		self.call(&request, ctx).await
	}

	/// Polls processing progress.
	pub async fn progress(&self, scene_id: &str, ctx: &RequestContext) -> Result<SceneProgress> {
		let request = ApiRequest::get(ScopeSet::DATA_READ, &self.path)
			.segments(["photoscene", scene_id, "progress"]);
		let envelope: SceneEnvelope<SceneProgress> = self.call(&request, ctx).await?;

		Ok(envelope.scene)
	}

	/// Requests the result in `format`.
	pub async fn results(
		&self,
		scene_id: &str,
		format: &str,
		ctx: &RequestContext,
	) -> Result<SceneResult> {
		let format = QueryParam::new("format", format);
		let request = ApiRequest::get(ScopeSet::DATA_READ, &self.path)
			.segments(["photoscene", scene_id])
			.filter(&format);
		let envelope: SceneEnvelope<SceneResult> = self.call(&request, ctx).await?;

		Ok(envelope.scene)
	}

	/// Stops processing without touching uploaded images.
	pub async fn cancel(&self, scene_id: &str, ctx: &RequestContext) -> Result<()> {
		let request = ApiRequest::new(oauth2::http::Method::GET, ScopeSet::DATA_WRITE, &self.path)
			.segments(["photoscene", scene_id, "cancel"])
			.content_type(client::CONTENT_TYPE_FORM);

		self.call::<Value>(&request, ctx).await.map(drop)
	}

	/// Removes the scene and every resource attached to it.
	pub async fn delete(&self, scene_id: &str, ctx: &RequestContext) -> Result<()> {
		let request = ApiRequest::delete(ScopeSet::DATA_WRITE, &self.path)
			.segments(["photoscene", scene_id])
			.content_type(client::CONTENT_TYPE_FORM);

		self.call::<Value>(&request, ctx).await.map(drop)
	}

	async fn upload(&self, form: Multipart, ctx: &RequestContext) -> Result<FileUpload> {
		let (content_type, body) = form.finish();
		let request = ApiRequest::post(ScopeSet::DATA_WRITE, &self.path)
			.segment("file")
			.body(content_type, body);

		self.call(&request, ctx).await
	}

	async fn call<T>(&self, request: &ApiRequest<'_>, ctx: &RequestContext) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.client.execute(request, ctx).await?;
		let status = response.status().as_u16();
		let mut reply = if response.body().is_empty() {
			Value::Null
		} else {
			client::decode_json::<Value>(&response)?
		};

		if let Some(error) = reply.get_mut("Error").map(Value::take).filter(|e| !e.is_null()) {
			return Err(decode_value::<SceneError>(error, status)?.into());
		}

		decode_value(reply, status)
	}
}

/// Minimal `multipart/form-data` encoder for text fields and in-memory files.
struct Multipart {
	boundary: String,
	body: Vec<u8>,
}
impl Multipart {
	fn new() -> Self {
		let boundary =
			rand::rng().sample_iter(Alphanumeric).take(BOUNDARY_LEN).map(char::from).collect();

		Self { boundary, body: Vec::new() }
	}

	fn text(&mut self, name: &str, value: &str) {
		self.open_part(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n"));
		self.body.extend_from_slice(value.as_bytes());
		self.body.extend_from_slice(b"\r\n");
	}

	fn file(&mut self, name: &str, file_name: &str, data: &[u8]) {
		self.open_part(&format!(
			"Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n"
		));
		self.body.extend_from_slice(data);
		self.body.extend_from_slice(b"\r\n");
	}

	fn open_part(&mut self, headers: &str) {
		self.body.extend_from_slice(format!("--{}\r\n{headers}\r\n", self.boundary).as_bytes());
	}

	/// Returns the content type and the closed body.
	fn finish(mut self) -> (String, Vec<u8>) {
		self.body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());

		(format!("multipart/form-data; boundary={}", self.boundary), self.body)
	}
}

fn decode_value<T>(value: Value, status: u16) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value).map_err(|source| Error::Decode { source, status })
}

fn code_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::String(text) => text,
		other => other.to_string(),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{FakeTransport, StaticAuth, json_response};

	fn api(transport: Arc<FakeTransport>) -> RecapApi {
		let client = Client::new(StaticAuth::new("https://forge.test"), transport);

		RecapApi::new(Arc::new(client))
	}

	#[tokio::test]
	async fn scene_creation_posts_a_form() {
		let transport = Arc::new(FakeTransport::scripted([json_response(
			200,
			r#"{"Usage":"0.1","Resource":"/photoscene","Photoscene":{"photosceneid":"s-1"}}"#,
		)]));
		let scene = api(transport.clone())
			.create_photo_scene(
				"bridge",
				&["rcm", "obj"],
				SceneType::Aerial,
				&RequestContext::new(),
			)
			.await
			.expect("Scene should be created.");

		assert_eq!(scene.id, "s-1");

		let sent = transport.requests().remove(0);

		assert_eq!(sent.uri, "https://forge.test/photo-to-3d/v1/photoscene");
		assert_eq!(sent.body_text(), "scenename=bridge&format=rcm%2Cobj&scenetype=aerial");
	}

	#[tokio::test]
	async fn error_members_in_success_replies_are_surfaced() {
		let transport = Arc::new(FakeTransport::scripted([json_response(
			200,
			r#"{"Usage":"0.1","Error":{"code":18,"msg":"Scene not found"}}"#,
		)]));
		let err = api(transport)
			.progress("missing", &RequestContext::new())
			.await
			.expect_err("Error member must fail the call.");

		assert!(matches!(
			err,
			Error::Scene(SceneError { ref code, ref message })
				if code == "18" && message == "Scene not found"
		));
	}

	#[tokio::test]
	async fn uploads_are_multipart() {
		let transport = Arc::new(FakeTransport::scripted([json_response(
			200,
			r#"{"photosceneid":"s-1","Files":{"file":{"filename":"data1","fileid":"f-1"}}}"#,
		)]));
		let upload = api(transport.clone())
			.add_file_by_data("s-1", b"\x89PNG", &RequestContext::new())
			.await
			.expect("Upload should succeed.");

		assert_eq!(upload.scene_id, "s-1");
		assert_eq!(upload.files["file"]["fileid"], "f-1");

		let sent = transport.requests().remove(0);
		let content_type = sent.headers[oauth2::http::header::CONTENT_TYPE]
			.to_str()
			.expect("Content type should be ASCII.");
		let boundary = content_type
			.strip_prefix("multipart/form-data; boundary=")
			.expect("Multipart content type should carry a boundary.");
		let body = sent.body_text();

		assert_eq!(boundary.len(), BOUNDARY_LEN);
		assert!(body.starts_with(&format!("--{boundary}\r\n")));
		assert!(body.contains("name=\"photosceneid\"\r\n\r\ns-1\r\n"));
		assert!(body.contains("name=\"file[0]\"; filename=\"data"));
		assert!(body.ends_with(&format!("--{boundary}--\r\n")));
	}

	#[tokio::test]
	async fn results_ask_for_the_format() {
		let transport = Arc::new(FakeTransport::scripted([json_response(
			200,
			r#"{"Photoscene":{"photosceneid":"s-1","progress":"100","scenelink":"https://cdn/s-1.obj","filesize":"42"}}"#,
		)]));
		let result = api(transport.clone())
			.results("s-1", "obj", &RequestContext::new())
			.await
			.expect("Result should decode.");

		assert_eq!(result.link, "https://cdn/s-1.obj");
		assert_eq!(
			transport.requests()[0].uri,
			"https://forge.test/photo-to-3d/v1/photoscene/s-1?format=obj"
		);
	}

	#[tokio::test]
	async fn cancel_and_delete_target_the_scene() {
		let transport = Arc::new(FakeTransport::scripted([
			json_response(200, r#"{"msg":"No error"}"#),
			json_response(200, ""),
		]));
		let api = api(transport.clone());
		let ctx = RequestContext::new();

		api.cancel("s-1", &ctx).await.expect("Cancel should succeed.");
		api.delete("s-1", &ctx).await.expect("Delete should succeed.");

		let sent = transport.requests();

		assert_eq!(sent[0].method, oauth2::http::Method::GET);
		assert_eq!(sent[0].uri, "https://forge.test/photo-to-3d/v1/photoscene/s-1/cancel");
		assert_eq!(sent[1].method, oauth2::http::Method::DELETE);
		assert_eq!(sent[1].uri, "https://forge.test/photo-to-3d/v1/photoscene/s-1");
	}
}
