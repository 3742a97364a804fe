//! Composable query-string contributors used to narrow listing requests.
//!
//! A [`Filter`] appends zero or more key/value pairs to a [`Query`]. The executor runs every
//! filter of a request into a scratch query first and only writes it into the URL once all of
//! them succeeded, so a failing filter never leaves a half-applied query behind.

// self
use crate::_prelude::*;

/// Ordered key/value pairs destined for the URL query string.
pub type Query = Vec<(String, String)>;

/// Key of the extension-type filter.
pub const KEY_EXTENSION_TYPE: &str = "filter[extension.type]";
/// Key of the hidden-state filter.
pub const KEY_HIDDEN: &str = "filter[hidden]";
/// Key of the id filter.
pub const KEY_ID: &str = "filter[id]";
/// Key of the MIME type filter.
pub const KEY_MIME_TYPE: &str = "filter[mimeType]";
/// Key of the name filter.
pub const KEY_NAME: &str = "filter[name]";
/// Key of the type filter.
pub const KEY_TYPE: &str = "filter[type]";
/// Key of the page number.
pub const KEY_PAGE_NUMBER: &str = "page[number]";
/// Key of the page size.
pub const KEY_PAGE_LIMIT: &str = "page[limit]";
/// Key of the page start marker.
pub const KEY_PAGE_START_AT: &str = "page[startAt]";
/// Key of the page prefix.
pub const KEY_PAGE_BEGINS_WITH: &str = "page[beginsWith]";

/// Page size used when none is requested.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Largest page size the services accept.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Errors raised by filters that validate their input.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum FilterError {
	/// A raw query parameter has no key.
	#[error("Query parameter key must not be empty.")]
	EmptyKey,
	/// A field filter has no field name.
	#[error("Filter field name must not be empty.")]
	EmptyName,
}

/// Contributes query parameters to a request.
pub trait Filter
where
	Self: Send + Sync,
{
	/// Appends this filter's pairs to `query`.
	fn add(&self, query: &mut Query) -> Result<(), FilterError>;
}
impl<F> Filter for Option<F>
where
	F: Filter,
{
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		match self {
			Some(filter) => filter.add(query),
			None => Ok(()),
		}
	}
}
impl<F> Filter for &F
where
	F: ?Sized + Filter,
{
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		(**self).add(query)
	}
}
impl<F> Filter for Vec<F>
where
	F: Filter,
{
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		self.iter().try_for_each(|filter| filter.add(query))
	}
}

/// Runs `filters` in order, stopping at the first error.
pub fn run_all(query: &mut Query, filters: &[&dyn Filter]) -> Result<(), FilterError> {
	filters.iter().try_for_each(|filter| filter.add(query))
}

/// Applies `filters` to `url` all-or-nothing.
pub(crate) fn apply(url: &mut Url, filters: &[&dyn Filter]) -> Result<(), FilterError> {
	let mut scratch = Query::new();

	run_all(&mut scratch, filters)?;

	if !scratch.is_empty() {
		url.query_pairs_mut().extend_pairs(scratch);
	}

	Ok(())
}

/// Clamps a page size into `1..=MAX_PAGE_LIMIT`, mapping `0` to [`DEFAULT_PAGE_LIMIT`].
pub const fn clamp_limit(limit: u32) -> u32 {
	match limit {
		0 => DEFAULT_PAGE_LIMIT,
		l if l > MAX_PAGE_LIMIT => MAX_PAGE_LIMIT,
		l => l,
	}
}

/// Operator suffix appended to a `filter[...]` key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
	/// Plain key, no suffix.
	#[default]
	None,
	/// `-eq`
	Equal,
	/// `-lt`
	Less,
	/// `-le`
	LessOrEqual,
	/// `-gt`
	Greater,
	/// `-ge`
	GreaterOrEqual,
	/// `-starts`
	StartsWith,
	/// `-ends`
	EndsWith,
	/// `-contains`
	Contains,
}
impl Comparison {
	/// Suffix rendered after the key.
	pub const fn suffix(self) -> &'static str {
		match self {
			Self::None => "",
			Self::Equal => "-eq",
			Self::Less => "-lt",
			Self::LessOrEqual => "-le",
			Self::Greater => "-gt",
			Self::GreaterOrEqual => "-ge",
			Self::StartsWith => "-starts",
			Self::EndsWith => "-ends",
			Self::Contains => "-contains",
		}
	}

	fn key(self, name: &str) -> String {
		format!("filter[{name}]{}", self.suffix())
	}
}
impl Display for Comparison {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.suffix())
	}
}

/// Pagination: prefix, start marker, page number, and a clamped page size.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
	/// Page size; `0` means the default of 10, values above 100 are clamped.
	pub limit: u32,
	/// Page number; omitted when `0`.
	pub number: u32,
	/// Only return entries starting with this prefix.
	pub begins_with: Option<String>,
	/// Resume after this marker.
	pub start_at: Option<String>,
}
impl Filter for Page {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		if let Some(prefix) = self.begins_with.as_deref().filter(|s| !s.is_empty()) {
			query.push((KEY_PAGE_BEGINS_WITH.into(), prefix.into()));
		}
		if let Some(marker) = self.start_at.as_deref().filter(|s| !s.is_empty()) {
			query.push((KEY_PAGE_START_AT.into(), marker.into()));
		}
		if self.number != 0 {
			query.push((KEY_PAGE_NUMBER.into(), self.number.to_string()));
		}

		query.push((KEY_PAGE_LIMIT.into(), clamp_limit(self.limit).to_string()));

		Ok(())
	}
}

/// Raw `key=value` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
	/// Query key; must not be empty.
	pub key: String,
	/// Query value.
	pub value: String,
}
impl QueryParam {
	/// Creates a raw pair.
	pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self { key: key.into(), value: value.into() }
	}
}
impl Filter for QueryParam {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		if self.key.is_empty() {
			return Err(FilterError::EmptyKey);
		}

		query.push((self.key.clone(), self.value.clone()));

		Ok(())
	}
}

/// Generic `filter[name]{op}=value` filter, one pair per value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
	/// Attribute name inside the brackets; must not be empty.
	pub name: String,
	/// Values, each rendered as its own pair.
	pub values: Vec<String>,
	/// Operator suffix.
	pub comparison: Comparison,
}
impl Field {
	/// Creates a field filter with the given operator.
	pub fn new<I, S>(name: impl Into<String>, comparison: Comparison, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { name: name.into(), values: values.into_iter().map(Into::into).collect(), comparison }
	}
}
impl Filter for Field {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		if self.name.is_empty() {
			return Err(FilterError::EmptyName);
		}

		let key = self.comparison.key(&self.name);

		query.extend(self.values.iter().map(|value| (key.clone(), value.clone())));

		Ok(())
	}
}

/// `filter[versionNumber]{op}=N`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionNumber {
	/// Operator suffix.
	pub comparison: Comparison,
	/// Version number compared against.
	pub version: i64,
}
impl Filter for VersionNumber {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		query.push((self.comparison.key("versionNumber"), self.version.to_string()));

		Ok(())
	}
}

/// Several version-number constraints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionNumberList(pub Vec<VersionNumber>);
impl Filter for VersionNumberList {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		self.0.add(query)
	}
}

/// Hidden-state selection; both flags may be set at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hidden(u8);
impl Hidden {
	/// Include hidden entries (`filter[hidden]=true`).
	pub const SHOW_HIDDEN: Self = Self(1);
	/// Include visible entries (`filter[hidden]=false`).
	pub const SHOW_NON_HIDDEN: Self = Self(2);

	/// Returns `true` if every flag in `other` is set.
	pub const fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}
}
impl std::ops::BitOr for Hidden {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}
impl Filter for Hidden {
	fn add(&self, query: &mut Query) -> Result<(), FilterError> {
		if self.contains(Self::SHOW_HIDDEN) {
			query.push((KEY_HIDDEN.into(), "true".into()));
		}
		if self.contains(Self::SHOW_NON_HIDDEN) {
			query.push((KEY_HIDDEN.into(), "false".into()));
		}

		Ok(())
	}
}

macro_rules! def_list_filter {
	($name:ident, $key:expr, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
		pub struct $name(pub Vec<String>);
		impl $name {
			/// Builds the filter from any list of strings.
			pub fn new<I, S>(values: I) -> Self
			where
				I: IntoIterator<Item = S>,
				S: Into<String>,
			{
				Self(values.into_iter().map(Into::into).collect())
			}
		}
		impl Filter for $name {
			fn add(&self, query: &mut Query) -> Result<(), FilterError> {
				query.extend(self.0.iter().map(|value| ($key.to_owned(), value.clone())));

				Ok(())
			}
		}
	};
}

def_list_filter! { Type, KEY_TYPE, "Filters by the type of the referenced entity." }
def_list_filter! { Id, KEY_ID, "Filters by entity id." }
def_list_filter! { Name, KEY_NAME, "Filters by entity name." }
def_list_filter! { ExtensionType, KEY_EXTENSION_TYPE, "Filters by extension type." }
def_list_filter! { MimeType, KEY_MIME_TYPE, "Filters by MIME type." }

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn render(filter: &dyn Filter) -> Query {
		let mut query = Query::new();

		filter.add(&mut query).expect("Filter should render.");

		query
	}

	fn pair(key: &str, value: &str) -> (String, String) {
		(key.to_owned(), value.to_owned())
	}

	#[test]
	fn page_limit_is_clamped() {
		for (limit, rendered) in [(0, "10"), (150, "100"), (55, "55"), (1, "1")] {
			assert_eq!(
				render(&Page { limit, ..Default::default() }),
				vec![pair(KEY_PAGE_LIMIT, rendered)]
			);
		}
	}

	#[test]
	fn page_renders_optional_parts_in_order() {
		let page = Page {
			limit: 20,
			number: 3,
			begins_with: Some("wip".into()),
			start_at: Some(String::new()),
		};

		assert_eq!(
			render(&page),
			vec![
				pair(KEY_PAGE_BEGINS_WITH, "wip"),
				pair(KEY_PAGE_NUMBER, "3"),
				pair(KEY_PAGE_LIMIT, "20")
			]
		);
	}

	#[test]
	fn comparisons_render_as_key_suffixes() {
		let field = Field::new("lastModifiedTime", Comparison::GreaterOrEqual, ["2020-01-01"]);
		let versions = VersionNumberList(vec![
			VersionNumber { comparison: Comparison::Less, version: 4 },
			VersionNumber { comparison: Comparison::None, version: 2 },
		]);

		assert_eq!(render(&field), vec![pair("filter[lastModifiedTime]-ge", "2020-01-01")]);
		assert_eq!(
			render(&versions),
			vec![pair("filter[versionNumber]-lt", "4"), pair("filter[versionNumber]", "2")]
		);
		assert_eq!(Comparison::Contains.to_string(), "-contains");
	}

	#[test]
	fn hidden_flags_combine() {
		assert_eq!(render(&Hidden::default()), Vec::new());
		assert_eq!(render(&Hidden::SHOW_HIDDEN), vec![pair(KEY_HIDDEN, "true")]);
		assert_eq!(
			render(&(Hidden::SHOW_HIDDEN | Hidden::SHOW_NON_HIDDEN)),
			vec![pair(KEY_HIDDEN, "true"), pair(KEY_HIDDEN, "false")]
		);
	}

	#[test]
	fn absent_filters_contribute_nothing() {
		let none: Option<Page> = None;

		assert!(render(&none).is_empty());
		assert!(render(&Id::default()).is_empty());
		assert_eq!(render(&Id::new(["a", "b"])), vec![pair(KEY_ID, "a"), pair(KEY_ID, "b")]);
	}

	#[test]
	fn failing_filter_leaves_the_url_untouched() {
		let mut url = Url::parse("https://example.com/items").expect("URL should parse.");
		let ok = QueryParam::new("a", "1");
		let bad = Field::new("", Comparison::Equal, ["x"]);
		let err = apply(&mut url, &[&ok, &bad]).expect_err("Empty names must fail.");

		assert_eq!(err, FilterError::EmptyName);
		assert_eq!(url.query(), None);

		apply(&mut url, &[&ok, &Name::new(["model"])]).expect("Valid filters should apply.");

		assert_eq!(url.query(), Some("a=1&filter%5Bname%5D=model"));
		assert_eq!(
			apply(&mut url, &[&QueryParam::new("", "v")]),
			Err(FilterError::EmptyKey)
		);
	}
}
