pub type ThemeResult<T> = Result<T, ThemeError>;

/// Errors raised while turning a sprite catalog into a cursor theme.
///
/// Everything except [`ThemeError::BadRender`], [`ThemeError::Remote`] and
/// [`ThemeError::Other`] is an input error and aborts the whole run.
#[derive(thiserror::Error, Debug)]
pub enum ThemeError {
    #[error("component {record}: malformed property string: {reason}")]
    MalformedProperties { record: String, reason: String },

    #[error("component {record}: missing required property `{key}`")]
    MissingProperty { record: String, key: &'static str },

    #[error("component {record}: unknown property `{key}`")]
    UnknownProperty { record: String, key: String },

    #[error("component {record}: invalid value `{value}` for property `{key}`")]
    InvalidPropertyValue {
        record: String,
        key: String,
        value: String,
    },

    #[error("component {record}: invalid animation description: {reason}")]
    InvalidDescription { record: String, reason: String },

    #[error("sprite {sprite}: must be square, got {width}x{height}")]
    NonSquareSprite {
        sprite: String,
        width: f64,
        height: f64,
    },

    #[error("sprite {sprite}: declared size {declared} does not match intrinsic size {intrinsic}")]
    SizeMismatch {
        sprite: String,
        declared: u32,
        intrinsic: f64,
    },

    #[error("sprite {sprite}: frame {frame} is declared more than once")]
    DuplicateFrame { sprite: String, frame: u32 },

    #[error("sprite {sprite}: invalid svg: {reason}")]
    InvalidSvg { sprite: String, reason: String },

    #[error("sprite {sprite}: invalid selector `{selector}`: {reason}")]
    InvalidSelector {
        sprite: String,
        selector: String,
        reason: String,
    },

    #[error("sprite {sprite}: selector `{selector}` matched no elements")]
    SelectorMatchedNothing { sprite: String, selector: String },

    #[error("sprite {sprite}: unknown animation instruction `{name}`")]
    UnknownInstruction { sprite: String, name: String },

    #[error("sprite {sprite}: invalid `{name}` instruction: {reason}")]
    InvalidInstruction {
        sprite: String,
        name: String,
        reason: String,
    },

    #[error("sprite {sprite}: rendered {width}x{height} at scale {scale}, expected {expected}x{expected}")]
    BadRender {
        sprite: String,
        scale: u32,
        expected: u32,
        width: u32,
        height: u32,
    },

    #[error("nodes {first} and {second} both export `{file_name}` ({format} at {scale}x)")]
    ExportConflict {
        first: String,
        second: String,
        file_name: String,
        format: String,
        scale: String,
    },

    #[error("variants `{first}` and `{second}` both map to directory `{slug}`")]
    SlugCollision {
        first: String,
        second: String,
        slug: String,
    },

    #[error("theme has no `default` variant")]
    MissingDefaultVariant,

    #[error("invalid theme configuration: {0}")]
    Config(String),

    #[error("request to {url} failed with status {status}")]
    Remote { url: String, status: u16 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ThemeError {
    /// Whether the error invalidates the whole run rather than a single cursor.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BadRender { .. } | Self::Remote { .. } | Self::Other(_))
    }
}
