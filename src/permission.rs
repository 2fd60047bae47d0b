//! Permission bitmask evaluation.
//!
//! The provider transmits permission sets as decimal strings because the values exceed the
//! 53-bit safe-integer range of many JSON consumers. They are always parsed as `u64`.

// crates.io
use bitflags::bitflags;
use serde::{
	Deserializer, Serializer,
	de::{Error as DeError, Visitor},
};
// self
use crate::_prelude::*;

bitflags! {
	/// Guild permission bitfield as reported for the authenticated user.
	///
	/// Unknown bits are retained so the raw value round-trips unchanged.
	#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
	pub struct Permissions: u64 {
		/// Bypasses every channel and guild permission check.
		const ADMINISTRATOR = 1 << 3;
		/// Allows managing guild settings; required to configure the bot.
		const MANAGE_GUILD = 1 << 5;
	}
}
impl Permissions {
	/// Returns `true` when every bit of `bit` is set in this bitmask.
	pub const fn has_bit(self, bit: u64) -> bool {
		has_bit(self.bits(), bit)
	}

	/// Returns `true` when the bitmask grants [`Permissions::MANAGE_GUILD`].
	pub const fn can_manage_guild(self) -> bool {
		self.has_bit(Self::MANAGE_GUILD.bits())
	}
}
impl FromStr for Permissions {
	type Err = PermissionParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();

		trimmed
			.parse::<u64>()
			.map(Self::from_bits_retain)
			.map_err(|_| PermissionParseError { raw: trimmed.to_owned() })
	}
}
impl Display for Permissions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}", self.bits())
	}
}
impl Serialize for Permissions {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_str(self)
	}
}
impl<'de> Deserialize<'de> for Permissions {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		deserializer.deserialize_any(PermissionsVisitor)
	}
}

/// Raised when a permission string is not an unsigned 64-bit integer.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Permission bitmask `{raw}` is not an unsigned 64-bit integer.")]
pub struct PermissionParseError {
	/// Offending input.
	pub raw: String,
}

struct PermissionsVisitor;
impl Visitor<'_> for PermissionsVisitor {
	type Value = Permissions;

	fn expecting(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("a permission bitmask as a decimal string or unsigned integer")
	}

	fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
	where
		E: DeError,
	{
		v.parse().map_err(E::custom)
	}

	fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
	where
		E: DeError,
	{
		Ok(Permissions::from_bits_retain(v))
	}

	fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
	where
		E: DeError,
	{
		u64::try_from(v)
			.map(Permissions::from_bits_retain)
			.map_err(|_| E::custom(PermissionParseError { raw: v.to_string() }))
	}
}

/// Tests a capability bit against a permission bitmask: `(bits & bit) == bit`.
pub const fn has_bit(bits: u64, bit: u64) -> bool {
	bits & bit == bit
}
