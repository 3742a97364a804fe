//! Model derivative: translation jobs, manifests, viewables metadata, and thumbnails.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	client::{ApiRequest, Client, RequestContext},
	filters::QueryParam,
};

/// Default service prefix.
pub const DEFAULT_MODEL_DERIVATIVE_PATH: &str = "modelderivative/v2/designdata";

/// Encodes an object id (`urn:adsk.objects:os.object:...`) as the URL-safe, unpadded base64 URN
/// the derivative service expects.
pub fn encode_urn(object_id: &str) -> String {
	URL_SAFE_NO_PAD.encode(object_id)
}

/// Translation job request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationParams {
	/// Source design.
	pub input: TranslationInput,
	/// Requested derivatives.
	pub output: OutputSpec,
}
impl TranslationParams {
	/// Minimal job translating a single uncompressed model into SVF with 2D and 3D views in the
	/// US region.
	pub fn svf(urn: impl Into<String>) -> Self {
		Self {
			input: TranslationInput { urn: urn.into(), ..Default::default() },
			output: OutputSpec {
				destination: DestinationSpec { region: Some("us".into()) },
				formats: vec![FormatSpec {
					kind: "svf".into(),
					views: vec!["2d".into(), "3d".into()],
				}],
			},
		}
	}
}

/// Source design of a translation job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationInput {
	/// Base64 URN of the source object.
	pub urn: String,
	/// Whether the source is a zip archive.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub compressed_urn: Option<bool>,
	/// Entry file inside a compressed source.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub root_file_name: Option<String>,
}

/// Requested or accepted derivative outputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSpec {
	/// Where the derivatives are stored.
	pub destination: DestinationSpec,
	/// Formats to produce.
	pub formats: Vec<FormatSpec>,
}

/// Storage region of the derivatives.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationSpec {
	/// `us` or `emea`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub region: Option<String>,
}

/// One output format.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpec {
	/// Format name, e.g. `svf`.
	#[serde(rename = "type")]
	pub kind: String,
	/// Views to produce, e.g. `2d` and `3d`.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub views: Vec<String>,
}

/// Reply to a translation request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranslationResult {
	/// `success` or `created`.
	pub result: String,
	/// URN of the source.
	pub urn: String,
	/// Outputs the service accepted.
	pub accepted_jobs: AcceptedJobs,
}

/// Outputs accepted by a translation job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptedJobs {
	/// Accepted outputs.
	pub output: OutputSpec,
}

/// Translation status of a design and its derivatives.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
	/// Always `manifest`.
	#[serde(rename = "type")]
	pub kind: String,
	/// Whether a thumbnail is available; the service sends `"true"`/`"false"`.
	#[serde(with = "string_bool")]
	pub has_thumbnail: bool,
	/// `pending`, `inprogress`, `success`, `failed`, or `timeout`.
	pub status: String,
	/// e.g. `complete` or `25% complete`.
	pub progress: String,
	/// Storage region.
	pub region: String,
	/// Base64 URN of the source.
	pub urn: String,
	/// Produced derivatives.
	pub derivatives: Vec<Derivative>,
}

/// One derivative listed in a [`Manifest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Derivative {
	/// Display name.
	pub name: String,
	/// Whether a thumbnail is available.
	#[serde(with = "string_bool")]
	pub has_thumbnail: bool,
	/// Role such as `viewable` or `graphics`.
	pub role: String,
	/// Status of this derivative.
	pub status: String,
	/// Progress of this derivative.
	pub progress: String,
	/// Output format.
	pub output_type: String,
	/// Nested resources.
	pub children: Vec<DerivativeChild>,
}

/// Resource nested under a [`Derivative`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativeChild {
	/// Viewable GUID.
	pub guid: String,
	/// Role such as `3d` or `thumbnail`.
	pub role: String,
	/// MIME type of the resource.
	pub mime: String,
	/// URN of the resource.
	pub urn: String,
	/// Progress of this resource.
	pub progress: String,
	/// Status of this resource.
	pub status: String,
}

/// Viewables of a translated design.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataResult {
	/// Payload.
	pub data: MetadataData,
}

/// Payload of a [`MetadataResult`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataData {
	/// Always `metadata`.
	#[serde(rename = "type")]
	pub kind: String,
	/// One entry per viewable.
	pub metadata: Vec<Viewable>,
}

/// One viewable; its GUID addresses the object tree and properties.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewable {
	/// Display name.
	pub name: String,
	/// `2d` or `3d`.
	pub role: String,
	/// Viewable GUID.
	pub guid: String,
}

/// Object hierarchy of one viewable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectTree {
	/// Payload.
	pub data: ObjectTreeData,
}

/// Payload of an [`ObjectTree`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectTreeData {
	/// Always `objects`.
	#[serde(rename = "type")]
	pub kind: String,
	/// Root nodes.
	pub objects: Vec<ObjectTreeNode>,
}

/// Node of an [`ObjectTree`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectTreeNode {
	/// Viewer object id.
	#[serde(rename = "objectid")]
	pub object_id: i64,
	/// Node name.
	pub name: String,
	/// Children.
	pub objects: Vec<ObjectTreeNode>,
}

/// Properties of every object in one viewable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
	/// Payload.
	pub data: PropertiesData,
	/// Set while extraction is still running.
	pub result: Option<String>,
}

/// Payload of [`Properties`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertiesData {
	/// Always `properties`.
	#[serde(rename = "type")]
	pub kind: String,
	/// One entry per object.
	pub collection: Vec<ObjectProperties>,
}

/// Properties of one object, grouped by category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectProperties {
	/// Viewer object id.
	#[serde(rename = "objectid")]
	pub object_id: i64,
	/// Object name.
	pub name: String,
	/// Id in the source design.
	pub external_id: String,
	/// Category to property map.
	pub properties: Value,
}

/// Model derivative endpoints.
#[derive(Clone, Debug)]
pub struct ModelDerivativeApi {
	client: Arc<Client>,
	path: String,
}
impl ModelDerivativeApi {
	/// Creates the API on the default prefix.
	pub fn new(client: Arc<Client>) -> Self {
		Self { client, path: DEFAULT_MODEL_DERIVATIVE_PATH.into() }
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

	/// Starts a translation job.
	pub async fn translate(
		&self,
		params: &TranslationParams,
		ctx: &RequestContext,
	) -> Result<TranslationResult> {
		let request = ApiRequest::post(ScopeSet::DATA_READ | ScopeSet::DATA_WRITE, &self.path)
			.segment("job")
			.json(params)?;

		self.client.execute_json(&request, ctx).await
	}

	/// Translates the object `object_id` into SVF, encoding the URN on the way.
	pub async fn translate_to_svf(
		&self,
		object_id: &str,
		ctx: &RequestContext,
	) -> Result<TranslationResult> {
		self.translate(&TranslationParams::svf(encode_urn(object_id)), ctx).await
	}

	/// Reads the translation manifest.
	pub async fn manifest(&self, urn: &str, ctx: &RequestContext) -> Result<Manifest> {
		let request = self.read([urn, "manifest"]);

		self.client.execute_json(&request, ctx).await
	}

	/// Lists the viewables of a translated design.
	pub async fn metadata(&self, urn: &str, ctx: &RequestContext) -> Result<MetadataResult> {
		let request = self.read([urn, "metadata"]);

		self.client.execute_json(&request, ctx).await
	}

	/// Reads the object hierarchy of one viewable.
	///
	/// A 202 response means extraction is still running; its body decodes to an empty tree.
	pub async fn object_tree(
		&self,
		urn: &str,
		guid: &str,
		ctx: &RequestContext,
	) -> Result<ObjectTree> {
		let force = force_get();
		let request = self.read([urn, "metadata", guid]).filter(&force);

		self.client.execute_json(&request, ctx).await
	}

	/// Reads the properties of every object in one viewable.
	pub async fn properties(
		&self,
		urn: &str,
		guid: &str,
		ctx: &RequestContext,
	) -> Result<Properties> {
		let force = force_get();
		let request = self.read([urn, "metadata", guid, "properties"]).filter(&force);

		self.client.execute_json(&request, ctx).await
	}

	/// Downloads the design thumbnail as PNG bytes.
	pub async fn thumbnail(&self, urn: &str, ctx: &RequestContext) -> Result<Vec<u8>> {
		let request = self.read([urn, "thumbnail"]);

		self.client.execute_bytes(&request, ctx).await
	}

	fn read<'a, const N: usize>(&self, segments: [&str; N]) -> ApiRequest<'a> {
		ApiRequest::get(ScopeSet::DATA_READ, &self.path).segments(segments)
	}
}

fn force_get() -> QueryParam {
	QueryParam::new("forceget", "true")
}

mod string_bool {
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
	use serde_json::Value;

	pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(if *value { "true" } else { "false" })
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Value::deserialize(deserializer)? {
			Value::Bool(flag) => Ok(flag),
			Value::String(text) => text.parse().map_err(D::Error::custom),
			Value::Null => Ok(false),
			other => Err(D::Error::custom(format!("expected a boolean, got {other}"))),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{FakeTransport, StaticAuth, json_response};

	fn api(transport: Arc<FakeTransport>) -> ModelDerivativeApi {
		let client = Client::new(StaticAuth::new("https://forge.test"), transport);

		ModelDerivativeApi::new(Arc::new(client))
	}

	#[test]
	fn urns_are_url_safe_and_unpadded() {
		assert_eq!(
			encode_urn("urn:adsk.objects:os.object:bucket/model.rvt"),
			"dXJuOmFkc2sub2JqZWN0czpvcy5vYmplY3Q6YnVja2V0L21vZGVsLnJ2dA"
		);
		assert!(!encode_urn("a?").contains(['+', '/', '=']));
	}

	#[tokio::test]
	async fn svf_translation_posts_the_preset() {
		let transport = Arc::new(FakeTransport::scripted([json_response(
			201,
			r#"{"result":"created","urn":"dXJu","acceptedJobs":{"output":{"formats":[{"type":"svf","views":["2d","3d"]}]}}}"#,
		)]));
		let result = api(transport.clone())
			.translate_to_svf("urn", &RequestContext::new())
			.await
			.expect("201 should decode.");

		assert_eq!(result.result, "created");
		assert_eq!(result.accepted_jobs.output.formats[0].views, ["2d", "3d"]);

		let sent = transport.requests().remove(0);
		let body: Value = serde_json::from_slice(&sent.body).expect("Job body should be JSON.");

		assert_eq!(sent.uri, "https://forge.test/modelderivative/v2/designdata/job");
		assert_eq!(body["input"], serde_json::json!({ "urn": "dXJu" }));
		assert_eq!(body["output"]["destination"]["region"], "us");
		assert_eq!(body["output"]["formats"][0]["type"], "svf");
	}

	#[tokio::test]
	async fn manifest_reads_string_flags() {
		let transport = Arc::new(FakeTransport::scripted([json_response(
			200,
			r#"{"type":"manifest","hasThumbnail":"true","status":"success","progress":"complete","derivatives":[{"hasThumbnail":"false","outputType":"svf"}]}"#,
		)]));
		let manifest = api(transport)
			.manifest("dXJu", &RequestContext::new())
			.await
			.expect("Manifest should decode.");

		assert!(manifest.has_thumbnail);
		assert!(!manifest.derivatives[0].has_thumbnail);
		assert_eq!(manifest.derivatives[0].output_type, "svf");
	}

	#[tokio::test]
	async fn object_queries_force_extraction() {
		let transport = Arc::new(FakeTransport::scripted([json_response(
			200,
			r#"{"data":{"type":"objects","objects":[{"objectid":1,"name":"Model","objects":[{"objectid":2,"name":"Wall"}]}]}}"#,
		)]));
		let tree = api(transport.clone())
			.object_tree("dXJu", "g-1", &RequestContext::new())
			.await
			.expect("Tree should decode.");

		assert_eq!(tree.data.objects[0].objects[0].name, "Wall");
		assert_eq!(
			transport.requests()[0].uri,
			"https://forge.test/modelderivative/v2/designdata/dXJu/metadata/g-1?forceget=true"
		);
	}
}
