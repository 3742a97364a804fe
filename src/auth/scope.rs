//! Bitset of the named permission scopes the Forge authentication service understands.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::_prelude::*;

/// Canonical scope names, indexed by bit position.
const SCOPE_NAMES: [&str; 15] = [
	"user-profile:read",
	"user:read",
	"user:write",
	"viewables:read",
	"data:read",
	"data:write",
	"data:create",
	"data:search",
	"bucket:create",
	"bucket:read",
	"bucket:update",
	"bucket:delete",
	"code:all",
	"account:read",
	"account:write",
];
const KNOWN_MASK: u64 = ScopeSet::END - 1;

// Every scope constant must have a name; the crate does not build otherwise.
const _: () = assert!(
	1_u64 << SCOPE_NAMES.len() == ScopeSet::END,
	"Scope constants and SCOPE_NAMES are out of sync."
);

/// Errors emitted by the strict [`FromStr`] parser.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeParseError {
	/// The token is not one of the known scope names.
	#[error("Unknown scope: {scope}.")]
	Unknown {
		/// The offending token.
		scope: String,
	},
}

/// Set of permission scopes encoded as bits.
///
/// A set is [valid](Self::is_valid) when it is non-empty and every bit maps to a known scope.
/// Values are plain `Copy` data with no lifecycle beyond construction.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeSet(u64);
impl ScopeSet {
	/// No scopes.
	pub const EMPTY: Self = Self(0);
	/// View the user's profile.
	pub const USER_PROFILE_READ: Self = Self(1 << 0);
	/// Read the user's account information.
	pub const USER_READ: Self = Self(1 << 1);
	/// Write the user's account information.
	pub const USER_WRITE: Self = Self(1 << 2);
	/// View viewable data.
	pub const VIEWABLES_READ: Self = Self(1 << 3);
	/// View data.
	pub const DATA_READ: Self = Self(1 << 4);
	/// Manage data.
	pub const DATA_WRITE: Self = Self(1 << 5);
	/// Create data.
	pub const DATA_CREATE: Self = Self(1 << 6);
	/// Search across data.
	pub const DATA_SEARCH: Self = Self(1 << 7);
	/// Create buckets.
	pub const BUCKET_CREATE: Self = Self(1 << 8);
	/// View buckets.
	pub const BUCKET_READ: Self = Self(1 << 9);
	/// Update buckets.
	pub const BUCKET_UPDATE: Self = Self(1 << 10);
	/// Delete buckets.
	pub const BUCKET_DELETE: Self = Self(1 << 11);
	/// Author or execute code.
	pub const CODE_ALL: Self = Self(1 << 12);
	/// View product and service accounts.
	pub const ACCOUNT_READ: Self = Self(1 << 13);
	/// Manage product and service accounts.
	pub const ACCOUNT_WRITE: Self = Self(1 << 14);
	const END: u64 = 1 << 15;

	/// Wraps raw bits without validation; use [`is_valid`](Self::is_valid) to check them.
	pub const fn from_bits(bits: u64) -> Self {
		Self(bits)
	}

	/// Raw bit representation.
	pub const fn bits(self) -> u64 {
		self.0
	}

	/// Returns true if no bits are set.
	pub const fn is_empty(self) -> bool {
		self.0 == 0
	}

	/// Returns true when the set is non-empty and carries only known scopes.
	pub const fn is_valid(self) -> bool {
		self.0 != 0 && self.0 & !KNOWN_MASK == 0
	}

	/// Returns true when every scope in `required` is also in `self`.
	pub const fn allows(self, required: Self) -> bool {
		self.0 & required.0 == required.0
	}

	/// Union of both sets.
	pub const fn union(self, other: Self) -> Self {
		Self(self.0 | other.0)
	}

	/// Lenient parser: splits on whitespace, matches names case-insensitively, and drops
	/// tokens it does not recognize.
	pub fn parse(text: &str) -> Self {
		text.split_whitespace().filter_map(lookup).fold(Self::EMPTY, Self::union)
	}

	/// Canonical names of the known scopes in this set, in bit order.
	pub fn names(self) -> impl Iterator<Item = &'static str> {
		SCOPE_NAMES
			.iter()
			.enumerate()
			.filter(move |(idx, _)| self.0 & (1 << idx) != 0)
			.map(|(_, name)| *name)
	}
}
impl std::ops::BitOr for ScopeSet {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self::Output {
		self.union(rhs)
	}
}
impl std::ops::BitOrAssign for ScopeSet {
	fn bitor_assign(&mut self, rhs: Self) {
		*self = self.union(rhs);
	}
}
impl std::ops::BitAnd for ScopeSet {
	type Output = Self;

	fn bitand(self, rhs: Self) -> Self::Output {
		Self(self.0 & rhs.0)
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ScopeSet({:#x}: {self})", self.0)
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		for (idx, name) in self.names().enumerate() {
			if idx > 0 {
				f.write_str(" ")?;
			}

			f.write_str(name)?;
		}

		Ok(())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.split_whitespace().try_fold(Self::EMPTY, |acc, token| {
			lookup(token)
				.map(|scope| acc | scope)
				.ok_or_else(|| ScopeParseError::Unknown { scope: token.to_owned() })
		})
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_str(self)
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = <String>::deserialize(deserializer)?;

		raw.parse().map_err(DeError::custom)
	}
}

fn lookup(token: &str) -> Option<ScopeSet> {
	SCOPE_NAMES
		.iter()
		.position(|name| name.eq_ignore_ascii_case(token))
		.map(|idx| ScopeSet(1 << idx))
}
