//! Hubs and the projects inside them.

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	client::{ApiRequest, Client, RequestContext},
	dm::{JsonApiArray, JsonApiObject},
	filters::{
		self, ExtensionType, Filter, FilterError, Id, KEY_EXTENSION_TYPE, KEY_PAGE_LIMIT,
		KEY_PAGE_NUMBER, Name, Query,
	},
};

/// Default service prefix.
pub const DEFAULT_HUB_API_PATH: &str = "project/v1/hubs";

const HUB_TYPE_NAMES: [&str; 3] =
	["hubs:autodesk.core:Hub", "hubs:autodesk.bim360:Account", "hubs:autodesk.a360:PersonalHub"];

/// Hub kinds to list, rendered as `filter[extension.type]` values.
///
/// [`HubType::ALL`] sets no bit and therefore adds no filter.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HubType(u8);
impl HubType {
	/// No restriction.
	pub const ALL: Self = Self(0);
	/// Team hubs.
	pub const TEAM: Self = Self(1 << 0);
	/// BIM 360 accounts.
	pub const BIM360: Self = Self(1 << 1);
	/// Personal hubs.
	pub const PERSONAL: Self = Self(1 << 2);

	/// Returns `true` if every bit in `other` is set.
	pub const fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}

	/// Extension type names for the set bits, in declaration order.
	pub fn names(self) -> impl Iterator<Item = &'static str> {
		HUB_TYPE_NAMES
			.into_iter()
			.enumerate()
			.filter(move |(i, _)| self.0 & (1 << i) != 0)
			.map(|(_, name)| name)
	}
}
impl std::ops::BitOr for HubType {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}
impl Debug for HubType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("HubType").field(&self.to_string()).finish()
	}
}
impl Display for HubType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.names().collect::<Vec<_>>().join(" "))
	}
}
impl Filter for HubType {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		query.extend(self.names().map(|name| (KEY_EXTENSION_TYPE.to_owned(), name.to_owned())));

		Ok(())
	}
}

/// Filters for [`HubApi::hubs`], applied as type, id, name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubsFilters {
	/// Hub kinds.
	pub hub_type: HubType,
	/// Hub ids.
	pub id: Id,
	/// Hub names.
	pub name: Name,
}
impl Filter for HubsFilters {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		filters::run_all(query, &[&self.hub_type, &self.id, &self.name])
	}
}

/// Filters for [`HubApi::projects`], applied as id, type, page number, page size.
///
/// Page number and size are omitted when zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListProjectFilters {
	/// Page number.
	pub number: u32,
	/// Page size.
	pub limit: u32,
	/// Project ids.
	pub id: Id,
	/// Project extension types.
	pub project_type: ExtensionType,
}
impl Filter for ListProjectFilters {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		filters::run_all(query, &[&self.id, &self.project_type])?;

		if self.number != 0 {
			query.push((KEY_PAGE_NUMBER.into(), self.number.to_string()));
		}
		if self.limit != 0 {
			query.push((KEY_PAGE_LIMIT.into(), self.limit.to_string()));
		}

		Ok(())
	}
}

/// Hub and project endpoints.
#[derive(Clone, Debug)]
pub struct HubApi {
	client: Arc<Client>,
	path: String,
}
impl HubApi {
	/// Creates the API on the default prefix.
	pub fn new(client: Arc<Client>) -> Self {
		Self { client, path: DEFAULT_HUB_API_PATH.into() }
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

	/// Lists the hubs visible to the caller.
	pub async fn hubs(
		&self,
		filters: Option<&HubsFilters>,
		ctx: &RequestContext,
	) -> Result<JsonApiArray> {
		let request = ApiRequest::get(ScopeSet::DATA_READ, &self.path).filter(&filters);

		self.client.execute_json(&request, ctx).await
	}

	/// Reads one hub.
	pub async fn hub_details(&self, hub_id: &str, ctx: &RequestContext) -> Result<JsonApiObject> {
		self.get(&[hub_id], ctx).await
	}

	/// Lists the projects of a hub.
	pub async fn projects(
		&self,
		hub_id: &str,
		filters: Option<&ListProjectFilters>,
		ctx: &RequestContext,
	) -> Result<JsonApiArray> {
		let request = ApiRequest::get(ScopeSet::DATA_READ, &self.path)
			.segments([hub_id, "projects"])
			.filter(&filters);

		self.client.execute_json(&request, ctx).await
	}

	/// Reads one project.
	pub async fn project_details(
		&self,
		hub_id: &str,
		project_id: &str,
		ctx: &RequestContext,
	) -> Result<JsonApiObject> {
		self.get(&[hub_id, "projects", project_id], ctx).await
	}

	/// Lists the top-level folders of a project the caller can see.
	pub async fn top_folders(
		&self,
		hub_id: &str,
		project_id: &str,
		ctx: &RequestContext,
	) -> Result<JsonApiArray> {
		self.get(&[hub_id, "projects", project_id, "topFolders"], ctx).await
	}

	async fn get<T>(&self, segments: &[&str], ctx: &RequestContext) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		let request =
			ApiRequest::get(ScopeSet::DATA_READ, &self.path).segments(segments.iter().copied());

		self.client.execute_json(&request, ctx).await
	}
}
