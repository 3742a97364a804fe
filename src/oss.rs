//! Object storage: buckets and the objects inside them.

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	client::{ApiRequest, CONTENT_TYPE_OCTET_STREAM, Client, RequestContext},
	filters::{self, Filter, FilterError, Query},
};

/// Default service prefix.
pub const DEFAULT_BUCKET_API_PATH: &str = "oss/v2/buckets";

/// Query key of [`BucketRegion`].
pub const KEY_REGION: &str = "region";
/// Query key of [`BucketLimit`].
pub const KEY_LIMIT: &str = "limit";
/// Query key of [`BucketStartAt`].
pub const KEY_START_AT: &str = "startAt";
/// Query key of [`ObjectBeginsWith`].
pub const KEY_BEGINS_WITH: &str = "beginsWith";

/// Region a bucket listing is restricted to; always sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketRegion {
	/// `US`
	#[default]
	#[serde(rename = "US")]
	Us,
	/// `EMEA`
	#[serde(rename = "EMEA")]
	Emea,
}
impl BucketRegion {
	/// Region code as sent on the wire.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Us => "US",
			Self::Emea => "EMEA",
		}
	}
}
impl Display for BucketRegion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl Filter for BucketRegion {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		query.push((KEY_REGION.into(), self.as_str().into()));

		Ok(())
	}
}

/// Listing page size; `0` means 10 and values above 100 are clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketLimit(pub u32);
impl Filter for BucketLimit {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		query.push((KEY_LIMIT.into(), filters::clamp_limit(self.0).to_string()));

		Ok(())
	}
}

/// Resume marker from a previous listing's `next`; omitted when empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStartAt(pub String);
impl Filter for BucketStartAt {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		if !self.0.is_empty() {
			query.push((KEY_START_AT.into(), self.0.clone()));
		}

		Ok(())
	}
}

/// Object key prefix; omitted when empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectBeginsWith(pub String);
impl Filter for ObjectBeginsWith {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		if !self.0.is_empty() {
			query.push((KEY_BEGINS_WITH.into(), self.0.clone()));
		}

		Ok(())
	}
}

/// Filters for [`BucketApi::list_buckets`], applied as region, limit, start marker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListBucketsFilters {
	/// Region to list.
	pub region: BucketRegion,
	/// Page size.
	pub limit: BucketLimit,
	/// Resume marker.
	pub start_at: BucketStartAt,
}
impl Filter for ListBucketsFilters {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		filters::run_all(query, &[&self.region, &self.limit, &self.start_at])
	}
}

/// Filters for [`BucketApi::list_objects`], applied as prefix, start marker, limit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListObjectsFilters {
	/// Page size.
	pub limit: BucketLimit,
	/// Resume marker.
	pub start_at: BucketStartAt,
	/// Object key prefix.
	pub begins_with: ObjectBeginsWith,
}
impl Filter for ListObjectsFilters {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		filters::run_all(query, &[&self.begins_with, &self.start_at, &self.limit])
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBucketRequest<'a> {
	bucket_key: &'a str,
	policy_key: &'a str,
}

/// Access granted to one application on a bucket.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BucketPermission {
	/// Application client id.
	pub auth_id: String,
	/// Access level, e.g. `full` or `read`.
	pub access: String,
}

/// Bucket metadata returned by creation and details calls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BucketDetails {
	/// Globally unique bucket key.
	pub bucket_key: String,
	/// Client id of the owning application.
	pub bucket_owner: String,
	/// Creation time in epoch milliseconds.
	pub create_date: u64,
	/// Applications with access to the bucket.
	pub permissions: Vec<BucketPermission>,
	/// Retention policy: `transient`, `temporary`, or `persistent`.
	pub policy_key: String,
}

/// One entry of a bucket listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListedBucket {
	/// Bucket key.
	pub bucket_key: String,
	/// Creation time in epoch milliseconds.
	pub created_date: u64,
	/// Retention policy.
	pub policy_key: String,
}

/// Page of buckets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListedBuckets {
	/// Buckets on this page.
	pub items: Vec<ListedBucket>,
	/// Link to the next page, if any.
	pub next: Option<String>,
}

/// Object metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectDetails {
	/// Bucket holding the object.
	pub bucket_key: String,
	/// `urn:adsk.objects:os.object:<bucket>/<object>` identifier.
	#[serde(rename = "objectId", alias = "objectID")]
	pub object_id: String,
	/// Object key inside the bucket.
	pub object_key: String,
	/// SHA-1 of the content.
	pub sha1: String,
	/// Size in bytes.
	pub size: u64,
	/// Content type recorded at upload.
	pub content_type: Option<String>,
	/// Download URL.
	pub location: String,
	/// Resumable-upload block sizes.
	pub block_sizes: Vec<i64>,
	/// Delta encodings.
	pub deltas: BTreeMap<String, String>,
}

/// Page of objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketContent {
	/// Objects on this page.
	pub items: Vec<ObjectDetails>,
	/// Link to the next page, if any.
	pub next: Option<String>,
}

/// Bucket and object endpoints.
#[derive(Clone, Debug)]
pub struct BucketApi {
	client: Arc<Client>,
	path: String,
}
impl BucketApi {
	/// Creates the API on the default prefix.
	pub fn new(client: Arc<Client>) -> Self {
		Self { client, path: DEFAULT_BUCKET_API_PATH.into() }
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

	/// Service prefix.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Creates a bucket with the given retention policy.
	pub async fn create_bucket(
		&self,
		bucket_key: &str,
		policy_key: &str,
		ctx: &RequestContext,
	) -> Result<BucketDetails> {
		let request = ApiRequest::post(ScopeSet::BUCKET_CREATE, &self.path)
			.json(&CreateBucketRequest { bucket_key, policy_key })?;

		self.client.execute_json(&request, ctx).await
	}

	/// Deletes a bucket and everything in it.
	pub async fn delete_bucket(&self, bucket_key: &str, ctx: &RequestContext) -> Result<()> {
		let request = ApiRequest::delete(ScopeSet::BUCKET_DELETE, &self.path).segment(bucket_key);

		self.client.execute_empty(&request, ctx).await
	}

	/// Lists buckets owned by the application.
	pub async fn list_buckets(
		&self,
		filters: Option<&ListBucketsFilters>,
		ctx: &RequestContext,
	) -> Result<ListedBuckets> {
		let request = ApiRequest::get(ScopeSet::BUCKET_READ, &self.path).filter(&filters);

		self.client.execute_json(&request, ctx).await
	}

	/// Reads one bucket's metadata.
	pub async fn bucket_details(
		&self,
		bucket_key: &str,
		ctx: &RequestContext,
	) -> Result<BucketDetails> {
		let request =
			ApiRequest::get(ScopeSet::BUCKET_READ, &self.path).segments([bucket_key, "details"]);

		self.client.execute_json(&request, ctx).await
	}

	/// Lists objects inside a bucket.
	pub async fn list_objects(
		&self,
		bucket_key: &str,
		filters: Option<&ListObjectsFilters>,
		ctx: &RequestContext,
	) -> Result<BucketContent> {
		let request = ApiRequest::get(ScopeSet::BUCKET_READ, &self.path)
			.segments([bucket_key, "objects"])
			.filter(&filters);

		self.client.execute_json(&request, ctx).await
	}

	/// Uploads `data` as `object_name`, replacing any existing object with that key.
	pub async fn upload_object(
		&self,
		bucket_key: &str,
		object_name: &str,
		data: Vec<u8>,
		ctx: &RequestContext,
	) -> Result<ObjectDetails> {
		let request = ApiRequest::put(ScopeSet::DATA_WRITE | ScopeSet::DATA_CREATE, &self.path)
			.segments([bucket_key, "objects", object_name])
			.body(CONTENT_TYPE_OCTET_STREAM, data);

		self.client.execute_json(&request, ctx).await
	}

	/// Downloads an object's raw bytes.
	pub async fn download_object(
		&self,
		bucket_key: &str,
		object_name: &str,
		ctx: &RequestContext,
	) -> Result<Vec<u8>> {
		let request = ApiRequest::new(oauth2::http::Method::GET, ScopeSet::DATA_READ, &self.path)
			.segments([bucket_key, "objects", object_name]);

		self.client.execute_bytes(&request, ctx).await
	}
}
