pub(crate) const DEFAULT_SEPARATOR: &str = "=";
pub(crate) const DEFAULT_END_OF_OPTIONS: &str = "--";

/// Comma separated regex list naming converter type paths to drop from the
/// default registry.
pub(crate) const CONVERTER_EXCLUDES_VAR: &str = "ARGSPEC_CONVERTER_EXCLUDES";

pub(crate) const AT_FILE_PREFIX: char = '@';
