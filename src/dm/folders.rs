//! Folders, items, and item versions inside a project.
//!
//! The same API serves both credential kinds: pass a [`Client`] built on a service identity for
//! app-owned data or on a delegated user for data the user can see.

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	client::{ApiRequest, Client, RequestContext},
	dm::{JsonApiArray, JsonApiObject},
	filters::{self, ExtensionType, Filter, FilterError, Id, Page, Query, Type, VersionNumberList},
};

/// Default service prefix.
pub const DEFAULT_FOLDER_API_PATH: &str = "data/v1/projects";

/// Filters for [`FolderApi::item_versions`], applied as pagination, id, type, extension type,
/// version numbers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemVersionFilters {
	/// Pagination; omitted when `None`.
	pub pagination: Option<Page>,
	/// Version number constraints.
	pub version_numbers: VersionNumberList,
	/// Version types.
	pub types: Type,
	/// Version ids.
	pub ids: Id,
	/// Version extension types.
	pub extension_types: ExtensionType,
}
impl Filter for ItemVersionFilters {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		filters::run_all(
			query,
			&[
				&self.pagination,
				&self.ids,
				&self.types,
				&self.extension_types,
				&self.version_numbers,
			],
		)
	}
}

/// Folder and item endpoints.
#[derive(Clone, Debug)]
pub struct FolderApi {
	client: Arc<Client>,
	path: String,
}
impl FolderApi {
	/// Creates the API on the default prefix.
	pub fn new(client: Arc<Client>) -> Self {
		Self { client, path: DEFAULT_FOLDER_API_PATH.into() }
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

	/// Reads one folder.
	pub async fn folder_details(
		&self,
		project_id: &str,
		folder_id: &str,
		ctx: &RequestContext,
	) -> Result<JsonApiObject> {
		self.get(self.request([project_id, "folders", folder_id]), ctx).await
	}

	/// Lists the folders and items inside a folder.
	pub async fn folder_contents(
		&self,
		project_id: &str,
		folder_id: &str,
		ctx: &RequestContext,
	) -> Result<JsonApiArray> {
		self.get(self.request([project_id, "folders", folder_id, "contents"]), ctx).await
	}

	/// Lists the folders of a project.
	pub async fn folders(&self, project_id: &str, ctx: &RequestContext) -> Result<JsonApiArray> {
		self.get(self.request([project_id, "folders"]), ctx).await
	}

	/// Reads one item.
	pub async fn item_details(
		&self,
		project_id: &str,
		item_id: &str,
		ctx: &RequestContext,
	) -> Result<JsonApiObject> {
		self.get(self.request([project_id, "items", item_id]), ctx).await
	}

	/// Reads the latest version of an item.
	pub async fn item_tip(
		&self,
		project_id: &str,
		item_id: &str,
		ctx: &RequestContext,
	) -> Result<JsonApiObject> {
		self.get(self.request([project_id, "items", item_id, "tip"]), ctx).await
	}

	/// Lists the versions of an item.
	pub async fn item_versions(
		&self,
		project_id: &str,
		item_id: &str,
		filters: Option<&ItemVersionFilters>,
		ctx: &RequestContext,
	) -> Result<JsonApiArray> {
		let request = self.request([project_id, "items", item_id, "versions"]).filter(&filters);

		self.get(request, ctx).await
	}

	fn request<'a, const N: usize>(&self, segments: [&str; N]) -> ApiRequest<'a> {
		ApiRequest::get(ScopeSet::DATA_READ, &self.path).segments(segments)
	}

	async fn get<T>(&self, request: ApiRequest<'_>, ctx: &RequestContext) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		self.client.execute_json(&request, ctx).await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{FakeTransport, StaticAuth, json_response},
		filters::{Comparison, VersionNumber},
	};

	#[test]
	fn version_filters_render_in_order() {
		let filters = ItemVersionFilters {
			pagination: Some(Page { limit: 5, ..Default::default() }),
			version_numbers: VersionNumberList(vec![VersionNumber {
				comparison: Comparison::GreaterOrEqual,
				version: 2,
			}]),
			types: Type::new(["versions"]),
			ids: Id::new(["v1"]),
			extension_types: ExtensionType::new(["versions:autodesk.core:File"]),
		};
		let mut query = Query::new();

		filters.add(&mut query).expect("Version filters never fail.");

		let keys = query.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>();

		assert_eq!(
			keys,
			[
				"page[limit]",
				"filter[id]",
				"filter[type]",
				"filter[extension.type]",
				"filter[versionNumber]-ge"
			]
		);
	}

	#[tokio::test]
	async fn item_versions_without_filters_send_a_bare_path() {
		let transport = Arc::new(FakeTransport::scripted([json_response(200, r#"{"data":[]}"#)]));
		let client = Client::new(StaticAuth::new("https://forge.test"), transport.clone());
		let api = FolderApi::new(Arc::new(client));
		let versions = api
			.item_versions("b.p1", "urn:adsk.wipprod:dm.lineage:x", None, &RequestContext::new())
			.await
			.expect("Listing should decode.");

		assert!(versions.data.is_empty());
		assert_eq!(
			transport.requests()[0].uri,
			"https://forge.test/data/v1/projects/b.p1/items/urn:adsk.wipprod:dm.lineage:x/versions"
		);
	}
}
