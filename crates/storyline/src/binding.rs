//! Binding captured step values to handler parameters.
//!
//! A matched step yields positional captures. Handlers read them through
//! [`StepArgs`], by position or by name. Names come from a chain of
//! [`ParameterNameProvider`]s consulted in order: names declared on the
//! candidate first, then the names recorded by the pattern. A named
//! parameter that is not a pattern group is looked up in the example row.
//!
//! Typed access goes through [`ValueConverters`], a registry of conversion
//! functions keyed by target type.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use hashbrown::HashMap;
use storyline_patterns::StepMatcher;
use thiserror::Error;

use crate::execution::ExecutionError;
use crate::table::{ExamplesTable, NamedParameters};

#[cfg(windows)]
const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
const LINE_SEPARATOR: &str = "\n";

/// Supplies the ordered parameter names of a step handler.
///
/// Returning `None` defers to the next provider in the chain.
pub trait ParameterNameProvider: Send + Sync {
    /// Parameter names for a handler bound to `matcher`.
    fn parameter_names(&self, matcher: &StepMatcher) -> Option<Vec<String>>;
}

/// Names declared explicitly alongside the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredParameterNames(pub Vec<String>);

impl ParameterNameProvider for DeclaredParameterNames {
    fn parameter_names(&self, _matcher: &StepMatcher) -> Option<Vec<String>> {
        (!self.0.is_empty()).then(|| self.0.clone())
    }
}

/// Names recorded by the step pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternParameterNames;

impl ParameterNameProvider for PatternParameterNames {
    fn parameter_names(&self, matcher: &StepMatcher) -> Option<Vec<String>> {
        let names = matcher.parameter_names();
        (!names.is_empty()).then(|| names.to_vec())
    }
}

/// Replace every `<name>` marker in `text` with its value in `parameters`.
///
/// Markers without a value are left untouched.
pub(crate) fn substitute_markers(text: &str, parameters: &NamedParameters) -> String {
    parameters
        .iter()
        .fold(text.to_string(), |acc, (name, value)| {
            acc.replace(&format!("<{name}>"), value)
        })
}

fn normalise_newlines(value: &str) -> String {
    let unix = value.replace("\r\n", "\n");
    if LINE_SEPARATOR == "\n" {
        unix
    } else {
        unix.replace('\n', LINE_SEPARATOR)
    }
}

/// Argument names and raw values resolved for one step invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BoundArguments {
    pub(crate) names: Vec<String>,
    pub(crate) values: Vec<String>,
}

/// Resolve the raw handler arguments of a matched step.
///
/// # Errors
///
/// Returns [`ExecutionError::ParameterNotFound`] when a parameter has
/// neither a capture nor a row value.
pub(crate) fn bind(
    text: &str,
    matcher: &StepMatcher,
    captures: &[String],
    providers: &[Arc<dyn ParameterNameProvider>],
    named: &NamedParameters,
) -> Result<BoundArguments, ExecutionError> {
    let prepare = |raw: &str| normalise_newlines(&substitute_markers(raw, named));
    let Some(names) = providers
        .iter()
        .find_map(|provider| provider.parameter_names(matcher))
    else {
        return Ok(BoundArguments {
            names: Vec::new(),
            values: captures.iter().map(|raw| prepare(raw)).collect(),
        });
    };
    let values = names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let raw = matcher
                .position_of(name)
                .and_then(|group| captures.get(group))
                .or_else(|| named.get(name))
                .or_else(|| captures.get(position))
                .ok_or_else(|| ExecutionError::ParameterNotFound {
                    text: text.to_string(),
                    name: name.clone(),
                })?;
            Ok::<_, ExecutionError>(prepare(raw))
        })
        .collect::<Result<Vec<_>, ExecutionError>>()?;
    Ok(BoundArguments { names, values })
}

/// Error raised when a raw argument cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConversionError {
    /// The step has no argument at the position.
    #[error("missing argument at position {0}")]
    MissingArgument(usize),
    /// The step has no argument with the name.
    #[error("missing argument `{0}`")]
    MissingNamedArgument(String),
    /// No converter is registered for the target type.
    #[error("no converter registered for {0}")]
    NoConverter(&'static str),
    /// The converter rejected the value.
    #[error("cannot convert `{value}` to {target}: {reason}")]
    Invalid {
        /// Raw value.
        value: String,
        /// Target type name.
        target: &'static str,
        /// Converter message.
        reason: String,
    },
}

type ConvertFn = Arc<dyn Fn(&str) -> Result<Box<dyn Any + Send>, String> + Send + Sync>;

/// Registry of raw-string converters keyed by target type.
///
/// The default registry converts to `String` (verbatim), every primitive
/// integer and float type, `bool`, `char` (trimmed) and [`ExamplesTable`].
///
/// # Examples
///
/// ```
/// use storyline::ValueConverters;
///
/// #[derive(Debug, PartialEq)]
/// struct Price(u32);
///
/// let mut converters = ValueConverters::default();
/// converters.register(|raw: &str| {
///     raw.trim_start_matches('$').parse().map(Price).map_err(|e| format!("{e}"))
/// });
/// assert_eq!(converters.convert::<Price>("$12").ok(), Some(Price(12)));
/// assert_eq!(converters.convert::<i64>(" 42 ").ok(), Some(42));
/// ```
#[derive(Clone)]
pub struct ValueConverters {
    converters: HashMap<TypeId, ConvertFn>,
}

impl ValueConverters {
    /// Registry without any converter.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Register `convert` for `T`, replacing any earlier converter.
    pub fn register<T, F>(&mut self, convert: F)
    where
        T: Any + Send,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        let erased: ConvertFn =
            Arc::new(move |raw: &str| convert(raw).map(|value| Box::new(value) as Box<dyn Any + Send>));
        self.converters.insert(TypeId::of::<T>(), erased);
    }

    /// Register `T`'s [`FromStr`] implementation applied to the trimmed
    /// value.
    pub fn register_from_str<T>(&mut self)
    where
        T: FromStr + Any + Send,
        T::Err: fmt::Display,
    {
        self.register(|raw: &str| raw.trim().parse::<T>().map_err(|e| e.to_string()));
    }

    /// Whether a converter for `T` is registered.
    #[must_use]
    pub fn supports<T: Any>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    /// Convert `raw` to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::NoConverter`] when `T` is unknown and
    /// [`ConversionError::Invalid`] when the converter rejects `raw`.
    pub fn convert<T: Any + Send>(&self, raw: &str) -> Result<T, ConversionError> {
        let target = type_name::<T>();
        let convert = self
            .converters
            .get(&TypeId::of::<T>())
            .ok_or(ConversionError::NoConverter(target))?;
        let invalid = |reason: String| ConversionError::Invalid {
            value: raw.to_string(),
            target,
            reason,
        };
        let boxed = convert(raw).map_err(invalid)?;
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| invalid("converter produced another type".to_string()))
    }
}

impl Default for ValueConverters {
    fn default() -> Self {
        let mut converters = Self::empty();
        converters.register(|raw: &str| Ok(raw.to_string()));
        converters.register_from_str::<i8>();
        converters.register_from_str::<i16>();
        converters.register_from_str::<i32>();
        converters.register_from_str::<i64>();
        converters.register_from_str::<i128>();
        converters.register_from_str::<isize>();
        converters.register_from_str::<u8>();
        converters.register_from_str::<u16>();
        converters.register_from_str::<u32>();
        converters.register_from_str::<u64>();
        converters.register_from_str::<u128>();
        converters.register_from_str::<usize>();
        converters.register_from_str::<f32>();
        converters.register_from_str::<f64>();
        converters.register_from_str::<bool>();
        converters.register_from_str::<char>();
        converters.register(|raw: &str| Ok(ExamplesTable::parse(raw)));
        converters
    }
}

impl fmt::Debug for ValueConverters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueConverters")
            .field("registered", &self.converters.len())
            .finish()
    }
}

/// Arguments handed to a step handler.
///
/// # Examples
///
/// ```
/// use storyline::{StepArgs, ValueConverters};
///
/// let converters = ValueConverters::default();
/// let args = StepArgs::new(
///     "a trader of symbol STK1 with 10 shares",
///     vec!["symbol".into(), "shares".into()],
///     vec!["STK1".into(), "10".into()],
///     &converters,
/// );
/// assert_eq!(args.raw(0), Some("STK1"));
/// assert_eq!(args.named::<u32>("shares").ok(), Some(10));
/// ```
#[derive(Debug, Clone)]
pub struct StepArgs<'a> {
    text: &'a str,
    names: Vec<String>,
    values: Vec<String>,
    converters: &'a ValueConverters,
}

impl<'a> StepArgs<'a> {
    /// Arguments for the step `text`.
    ///
    /// `names` may be empty when the handler reads arguments by position.
    #[must_use]
    pub fn new(
        text: &'a str,
        names: Vec<String>,
        values: Vec<String>,
        converters: &'a ValueConverters,
    ) -> Self {
        Self {
            text,
            names,
            values,
            converters,
        }
    }

    pub(crate) fn from_bound(
        text: &'a str,
        bound: BoundArguments,
        converters: &'a ValueConverters,
    ) -> Self {
        Self::new(text, bound.names, bound.values, converters)
    }

    /// Step text as performed, with example values substituted.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the step has no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameter names, empty for positional binding.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Raw value at `index`.
    #[must_use]
    pub fn raw(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Raw value of the parameter called `name`.
    #[must_use]
    pub fn raw_named(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|n| n == name)?;
        self.raw(index)
    }

    /// Value at `index` converted to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when the argument is missing or cannot be
    /// converted.
    pub fn get<T: Any + Send>(&self, index: usize) -> Result<T, ConversionError> {
        let raw = self
            .raw(index)
            .ok_or(ConversionError::MissingArgument(index))?;
        self.converters.convert(raw)
    }

    /// Value of the parameter called `name` converted to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when the argument is missing or cannot be
    /// converted.
    pub fn named<T: Any + Send>(&self, name: &str) -> Result<T, ConversionError> {
        let raw = self
            .raw_named(name)
            .ok_or_else(|| ConversionError::MissingNamedArgument(name.to_string()))?;
        self.converters.convert(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[expect(clippy::expect_used, reason = "test helper with descriptive failures")]
    fn matcher(pattern: &str) -> StepMatcher {
        StepMatcher::new(pattern).expect("test pattern should compile")
    }

    fn row(pairs: &[(&str, &str)]) -> NamedParameters {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[fixture]
    fn pattern_names() -> Vec<Arc<dyn ParameterNameProvider>> {
        vec![Arc::new(PatternParameterNames)]
    }

    #[rstest]
    fn binds_captures_by_pattern_name(pattern_names: Vec<Arc<dyn ParameterNameProvider>>) {
        let m = matcher("$from pays $to");
        let captures = vec!["Ann".to_string(), "Bob".to_string()];
        let bound = bind("Ann pays Bob", &m, &captures, &pattern_names, &row(&[]))
            .unwrap_or_default();
        assert_eq!(bound.names, ["from", "to"]);
        assert_eq!(bound.values, ["Ann", "Bob"]);
    }

    #[rstest]
    fn declared_names_reach_row_values(pattern_names: Vec<Arc<dyn ParameterNameProvider>>) {
        let m = matcher("a trader of $symbol");
        let mut providers: Vec<Arc<dyn ParameterNameProvider>> = vec![Arc::new(
            DeclaredParameterNames(vec!["symbol".into(), "price".into()]),
        )];
        providers.extend(pattern_names);
        let captures = vec!["STK1".to_string()];
        let named = row(&[("price", "10"), ("symbol", "IGNORED")]);
        let bound =
            bind("a trader of STK1", &m, &captures, &providers, &named).unwrap_or_default();
        assert_eq!(bound.values, ["STK1", "10"]);
    }

    #[rstest]
    fn substitutes_row_markers_in_captures(pattern_names: Vec<Arc<dyn ParameterNameProvider>>) {
        let m = matcher("a value $n");
        let captures = vec!["<n>".to_string()];
        let bound = bind("a value <n>", &m, &captures, &pattern_names, &row(&[("n", "5")]))
            .unwrap_or_default();
        assert_eq!(bound.values, ["5"]);
    }

    #[test]
    fn positional_binding_without_names() {
        let m = matcher("nothing to name");
        let bound = bind("nothing to name", &m, &[], &[], &row(&[])).unwrap_or_default();
        assert!(bound.names.is_empty());
        assert!(bound.values.is_empty());
    }

    #[test]
    fn unknown_declared_name_is_not_found() {
        let m = matcher("a plain step");
        let providers: Vec<Arc<dyn ParameterNameProvider>> =
            vec![Arc::new(DeclaredParameterNames(vec!["missing".into()]))];
        let Err(err) = bind("a plain step", &m, &[], &providers, &row(&[])) else {
            panic!("binding should fail");
        };
        assert!(matches!(err, ExecutionError::ParameterNotFound { ref name, .. } if name == "missing"));
        assert!(err.is_pending());
    }

    #[rstest]
    fn normalises_line_endings(pattern_names: Vec<Arc<dyn ParameterNameProvider>>) {
        let m = matcher("the document $body");
        let captures = vec!["one\r\ntwo".to_string()];
        let bound = bind("the document", &m, &captures, &pattern_names, &row(&[]))
            .unwrap_or_default();
        assert_eq!(bound.values, [format!("one{LINE_SEPARATOR}two")]);
    }

    #[rstest]
    #[case("42", Some(42))]
    #[case(" 7 ", Some(7))]
    #[case("seven", None)]
    fn converts_integers(#[case] raw: &str, #[case] expected: Option<i32>) {
        assert_eq!(ValueConverters::default().convert::<i32>(raw).ok(), expected);
    }

    #[test]
    fn strings_keep_whitespace() {
        let converters = ValueConverters::default();
        assert_eq!(converters.convert::<String>(" padded ").ok(), Some(" padded ".into()));
    }

    #[test]
    fn tables_convert_from_text() {
        let converters = ValueConverters::default();
        let table = converters
            .convert::<ExamplesTable>("|a|b|\n|1|2|")
            .unwrap_or_default();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn unknown_target_reports_no_converter() {
        struct Opaque;
        let Err(err) = ValueConverters::empty().convert::<Opaque>("x") else {
            panic!("conversion should fail");
        };
        assert!(matches!(err, ConversionError::NoConverter(_)));
    }

    #[test]
    fn invalid_value_names_target() {
        let Err(err) = ValueConverters::default().convert::<bool>("maybe") else {
            panic!("conversion should fail");
        };
        assert!(err.to_string().contains("bool"));
    }

    #[test]
    fn args_read_by_name_and_position() {
        let converters = ValueConverters::default();
        let args = StepArgs::new(
            "I add 3",
            vec!["n".into()],
            vec!["3".into()],
            &converters,
        );
        assert_eq!(args.len(), 1);
        assert_eq!(args.get::<u8>(0).ok(), Some(3));
        assert_eq!(args.named::<u8>("n").ok(), Some(3));
        assert!(matches!(args.get::<u8>(1), Err(ConversionError::MissingArgument(1))));
        assert!(matches!(
            args.named::<u8>("m"),
            Err(ConversionError::MissingNamedArgument(_))
        ));
    }
}
