//! Static catalog of every configurable setting.
//!
//! Each entry records how the setting merges ([`Category`]), when it is read
//! ([`Temporal`]) and what payload its values carry ([`ValueKind`]).

use std::fmt;
use std::str::FromStr;

use super::SettingsError;

/// Merge behavior of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Single value, the higher side wins outright.
    Scalar,
    /// Duplicate-free sequence, union-merged.
    OrderedList,
    /// Key-ordered map, union-merged by key.
    OrderedMap,
    /// Tri-state per-key attributes.
    CustomAttribute,
}

impl Category {
    /// Whether values of this category accumulate across layers.
    pub fn is_cumulative(self) -> bool {
        match self {
            Category::OrderedList | Category::OrderedMap => true,
            Category::Scalar | Category::CustomAttribute => false,
        }
    }
}

/// When the engine consumes a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Temporal {
    /// Read once by the parser; frozen after parsing starts.
    ParseTime,
    /// Read during execution; mutable for the instance's lifetime.
    RenderTime,
}

/// Payload type of scalar values, list items or map values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Text,
    Strategy,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::Text => "text",
            ValueKind::Strategy => "strategy object",
        };
        f.write_str(name)
    }
}

macro_rules! catalog {
    ($( $variant:ident => ($name:literal, $camel:literal, $category:ident, $temporal:ident, $kind:ident), )*) => {
        /// A configurable setting of the template engine.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Setting {
            $( $variant, )*
        }

        /// Catalog entry describing one [`Setting`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct SettingInfo {
            pub setting: Setting,
            pub name: &'static str,
            pub camel_case_name: &'static str,
            pub category: Category,
            pub temporal: Temporal,
            pub kind: ValueKind,
        }

        const CATALOG: &[SettingInfo] = &[
            $( SettingInfo {
                setting: Setting::$variant,
                name: $name,
                camel_case_name: $camel,
                category: Category::$category,
                temporal: Temporal::$temporal,
                kind: ValueKind::$kind,
            }, )*
        ];
    };
}

catalog! {
    // Parser settings
    TemplateLanguage => ("template_language", "templateLanguage", Scalar, ParseTime, Text),
    TagSyntax => ("tag_syntax", "tagSyntax", Scalar, ParseTime, Text),
    NamingConvention => ("naming_convention", "namingConvention", Scalar, ParseTime, Text),
    WhitespaceStripping => ("whitespace_stripping", "whitespaceStripping", Scalar, ParseTime, Bool),
    StrictSyntaxMode => ("strict_syntax_mode", "strictSyntaxMode", Scalar, ParseTime, Bool),
    AutoEscapingPolicy => ("auto_escaping_policy", "autoEscapingPolicy", Scalar, ParseTime, Text),
    OutputFormat => ("output_format", "outputFormat", Scalar, ParseTime, Strategy),
    RecognizeStandardFileExtensions => ("recognize_standard_file_extensions", "recognizeStandardFileExtensions", Scalar, ParseTime, Bool),
    TabSize => ("tab_size", "tabSize", Scalar, ParseTime, Int),
    SourceEncoding => ("source_encoding", "sourceEncoding", Scalar, ParseTime, Text),

    // Processing settings
    Locale => ("locale", "locale", Scalar, RenderTime, Text),
    TimeZone => ("time_zone", "timeZone", Scalar, RenderTime, Text),
    SqlDateAndTimeTimeZone => ("sql_date_and_time_time_zone", "SQLDateAndTimeTimeZone", Scalar, RenderTime, Text),
    NumberFormat => ("number_format", "numberFormat", Scalar, RenderTime, Text),
    BooleanFormat => ("boolean_format", "booleanFormat", Scalar, RenderTime, Text),
    DateFormat => ("date_format", "dateFormat", Scalar, RenderTime, Text),
    TimeFormat => ("time_format", "timeFormat", Scalar, RenderTime, Text),
    DateTimeFormat => ("date_time_format", "dateTimeFormat", Scalar, RenderTime, Text),
    OutputEncoding => ("output_encoding", "outputEncoding", Scalar, RenderTime, Text),
    UrlEscapingCharset => ("url_escaping_charset", "URLEscapingCharset", Scalar, RenderTime, Text),
    AutoFlush => ("auto_flush", "autoFlush", Scalar, RenderTime, Bool),
    ShowErrorTips => ("show_error_tips", "showErrorTips", Scalar, RenderTime, Bool),
    ApiBuiltinEnabled => ("api_builtin_enabled", "APIBuiltinEnabled", Scalar, RenderTime, Bool),
    LogTemplateExceptions => ("log_template_exceptions", "logTemplateExceptions", Scalar, RenderTime, Bool),
    LazyImports => ("lazy_imports", "lazyImports", Scalar, RenderTime, Bool),
    LazyAutoImports => ("lazy_auto_imports", "lazyAutoImports", Scalar, RenderTime, Bool),
    ArithmeticEngine => ("arithmetic_engine", "arithmeticEngine", Scalar, RenderTime, Strategy),
    ObjectWrapper => ("object_wrapper", "objectWrapper", Scalar, RenderTime, Strategy),
    TemplateExceptionHandler => ("template_exception_handler", "templateExceptionHandler", Scalar, RenderTime, Strategy),
    NewBuiltinClassResolver => ("new_builtin_class_resolver", "newBuiltinClassResolver", Scalar, RenderTime, Strategy),
    AutoIncludes => ("auto_includes", "autoIncludes", OrderedList, RenderTime, Text),
    AutoImports => ("auto_imports", "autoImports", OrderedMap, RenderTime, Text),
    CustomNumberFormats => ("custom_number_formats", "customNumberFormats", OrderedMap, RenderTime, Strategy),
    CustomDateFormats => ("custom_date_formats", "customDateFormats", OrderedMap, RenderTime, Strategy),
    CustomAttributes => ("custom_attributes", "customAttributes", CustomAttribute, RenderTime, Text),
}

impl Setting {
    /// Every setting, in catalog order.
    pub fn all() -> impl Iterator<Item = Setting> {
        CATALOG.iter().map(|info| info.setting)
    }

    /// Settings whose values live in the per-setting storage of layers,
    /// roots and instances (everything except custom attributes).
    pub fn stored() -> impl Iterator<Item = Setting> {
        Self::all().filter(|s| s.category() != Category::CustomAttribute)
    }

    pub fn info(self) -> &'static SettingInfo {
        // The macro emits variants and catalog rows in the same order.
        &CATALOG[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn category(self) -> Category {
        self.info().category
    }

    pub fn temporal(self) -> Temporal {
        self.info().temporal
    }

    pub fn kind(self) -> ValueKind {
        self.info().kind
    }

    pub fn is_parse_time(self) -> bool {
        self.temporal() == Temporal::ParseTime
    }

    /// Looks a setting up by its snake_case or camelCase name.
    pub fn from_name(name: &str) -> Result<Setting, SettingsError> {
        CATALOG
            .iter()
            .find(|info| info.name == name || info.camel_case_name == name)
            .map(|info| info.setting)
            .ok_or_else(|| SettingsError::UnknownSetting(name.to_string()))
    }
}

impl FromStr for Setting {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Setting::from_name(s)
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_rows_match_variants() {
        for (index, info) in CATALOG.iter().enumerate() {
            assert_eq!(info.setting as usize, index, "row out of order: {}", info.name);
            assert_eq!(info.setting.info(), info);
        }
    }

    #[test]
    fn test_lookup_by_both_naming_conventions() {
        assert_eq!(Setting::from_name("tab_size").unwrap(), Setting::TabSize);
        assert_eq!(Setting::from_name("tabSize").unwrap(), Setting::TabSize);
        assert_eq!("APIBuiltinEnabled".parse::<Setting>().unwrap(), Setting::ApiBuiltinEnabled);
        for setting in Setting::all() {
            assert_eq!(Setting::from_name(setting.name()).unwrap(), setting);
            assert_eq!(Setting::from_name(setting.info().camel_case_name).unwrap(), setting);
        }
    }

    #[test]
    fn test_unknown_setting() {
        let result = Setting::from_name("no_such_setting");
        assert!(matches!(result, Err(SettingsError::UnknownSetting(name)) if name == "no_such_setting"));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = CATALOG
            .iter()
            .flat_map(|info| [info.name, info.camel_case_name])
            .collect();
        names.sort_unstable();
        let total = names.len();
        names.dedup();
        // Single-word settings share their snake_case and camelCase spelling.
        let single_word = CATALOG.iter().filter(|i| i.name == i.camel_case_name).count();
        assert_eq!(names.len(), total - single_word);
    }

    #[test]
    fn test_partition() {
        let parse_time: Vec<Setting> = Setting::all().filter(|s| s.is_parse_time()).collect();
        assert_eq!(parse_time.len(), 10);
        assert!(parse_time.iter().all(|s| s.category() == Category::Scalar));
        assert_eq!(Setting::AutoImports.temporal(), Temporal::RenderTime);
        assert_eq!(Setting::CustomAttributes.category(), Category::CustomAttribute);
        assert!(Setting::stored().all(|s| s != Setting::CustomAttributes));
    }
}
