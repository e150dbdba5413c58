//! Marker parser

use crate::MetadataIndex;
use registrar_bytecode::{ElementValue, ModuleFile};
use registrar_core::{
    names, AcceptorStrategy, ErrorReporter, Marker, ProducerStrategy, RegistrarError,
    RegistrarResult, Selector, TypeName,
};
use std::sync::Arc;

/// Reads marker declarations off attribute-type modules.
#[derive(Debug, Clone, Copy)]
pub struct MarkerParser<'a> {
    index: &'a MetadataIndex,
}

impl<'a> MarkerParser<'a> {
    pub fn new(index: &'a MetadataIndex) -> Self {
        Self { index }
    }

    /// Parse the marker declared by `attribute`.
    pub fn parse(&self, attribute: &TypeName) -> RegistrarResult<Marker> {
        let module = self
            .index
            .module(attribute.as_str())
            .ok_or_else(|| RegistrarError::metadata(attribute, "marker type was not scanned"))?;
        parse_marker(module)
    }
}

/// Parse a marker declaration from a scanned module.
pub fn parse_marker(module: &ModuleFile) -> RegistrarResult<Marker> {
    if !module.is_attribute_type() {
        return Err(RegistrarError::metadata(
            &module.name,
            "marker declaration on a module that is not an attribute type",
        ));
    }
    if !module.has_annotation(names::MARKER) {
        return Err(RegistrarError::metadata(&module.name, "missing registrar/Marker"));
    }

    let by_attribute = type_argument(module, names::SELECT_BY_ATTRIBUTE)?;
    let by_super_type = type_argument(module, names::SELECT_BY_SUPER_TYPE)?;
    let selector = match (by_attribute, by_super_type) {
        (Some(t), None) => Selector::ByAttribute(t),
        (None, Some(t)) => Selector::BySuperType(t),
        (None, None) => {
            return Err(RegistrarError::metadata(&module.name, "marker declares no selector"));
        }
        (Some(_), Some(_)) => {
            return Err(RegistrarError::metadata(
                &module.name,
                "marker declares more than one selector",
            ));
        }
    };

    let produce = match str_argument(module, names::PRODUCE_VIA)? {
        Some(value) => ProducerStrategy::parse(&value).ok_or_else(|| {
            RegistrarError::metadata(&module.name, format!("unknown producer strategy `{}`", value))
        })?,
        None => ProducerStrategy::default(),
    };
    let accept = match str_argument(module, names::ACCEPT_VIA)? {
        Some(value) => AcceptorStrategy::parse(&value).ok_or_else(|| {
            RegistrarError::metadata(&module.name, format!("unknown acceptor strategy `{}`", value))
        })?,
        None => AcceptorStrategy::default(),
    };

    Ok(Marker {
        attribute: module.name.clone(),
        selector,
        produce,
        accept,
    })
}

/// The `value` element of at most one `attribute` annotation.
fn argument<'m>(module: &'m ModuleFile, attribute: &str) -> RegistrarResult<Option<&'m ElementValue>> {
    let mut found = module
        .annotations
        .iter()
        .filter(|a| a.type_name.as_str() == attribute);
    let Some(annotation) = found.next() else {
        return Ok(None);
    };
    if found.next().is_some() {
        return Err(RegistrarError::metadata(
            &module.name,
            format!("{} declared more than once", attribute),
        ));
    }
    annotation
        .element(names::VALUE)
        .map(Some)
        .ok_or_else(|| RegistrarError::metadata(&module.name, format!("{} has no `value`", attribute)))
}

fn type_argument(module: &ModuleFile, attribute: &str) -> RegistrarResult<Option<TypeName>> {
    match argument(module, attribute)? {
        None => Ok(None),
        Some(ElementValue::Type(t)) => Ok(Some(t.clone())),
        Some(_) => Err(RegistrarError::metadata(
            &module.name,
            format!("{} `value` must be a type", attribute),
        )),
    }
}

fn str_argument(module: &ModuleFile, attribute: &str) -> RegistrarResult<Option<String>> {
    match argument(module, attribute)? {
        None => Ok(None),
        Some(ElementValue::Str(s)) => Ok(Some(s.clone())),
        Some(_) => Err(RegistrarError::metadata(
            &module.name,
            format!("{} `value` must be a string", attribute),
        )),
    }
}

/// Every marker declared in the index, in scan order. Malformed declarations
/// are reported and skipped.
pub fn discover_markers(index: &MetadataIndex, reporter: &ErrorReporter) -> Vec<Arc<Marker>> {
    let parser = MarkerParser::new(index);
    let markers: Vec<Arc<Marker>> = index
        .carriers_of(names::MARKER)
        .filter_map(|attribute| reporter.capture(parser.parse(attribute)))
        .map(Arc::new)
        .collect();
    tracing::info!(markers = markers.len(), "Markers discovered");
    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Origin;
    use registrar_bytecode::Annotation;
    use registrar_test_utils::{marker_module, marker_with_strategies, ModuleBuilder};

    #[test]
    fn test_defaults_to_callback_strategies() {
        let module = marker_module("app/Plugins", &Selector::ByAttribute("app/Plugin".into())).build();
        let marker = parse_marker(&module).unwrap();
        assert_eq!(marker.selector, Selector::ByAttribute("app/Plugin".into()));
        assert_eq!(marker.produce, ProducerStrategy::Callback);
        assert_eq!(marker.accept, AcceptorStrategy::Callback);
    }

    #[test]
    fn test_explicit_strategies() {
        let module = marker_with_strategies(
            "app/Services",
            &Selector::BySuperType("app/Service".into()),
            "constructor",
            "none",
        )
        .build();
        let marker = parse_marker(&module).unwrap();
        assert_eq!(marker.selector, Selector::BySuperType("app/Service".into()));
        assert_eq!(marker.produce, ProducerStrategy::Constructor);
        assert_eq!(marker.accept, AcceptorStrategy::None);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let module = marker_with_strategies(
            "app/Services",
            &Selector::ByAttribute("app/Service".into()),
            "factory",
            "callback",
        )
        .build();
        let err = parse_marker(&module).unwrap_err();
        assert!(err.to_string().contains("unknown producer strategy `factory`"));
    }

    #[test]
    fn test_selector_count_enforced() {
        let none = ModuleBuilder::new("app/M").attribute_type().carries(names::MARKER).build();
        assert!(parse_marker(&none).unwrap_err().to_string().contains("no selector"));

        let both = marker_module("app/M", &Selector::ByAttribute("app/Y".into()))
            .annotate(
                Annotation::new(names::SELECT_BY_SUPER_TYPE)
                    .with(names::VALUE, ElementValue::Type("app/S".into())),
            )
            .build();
        assert!(parse_marker(&both).unwrap_err().to_string().contains("more than one selector"));
    }

    #[test]
    fn test_not_an_attribute_type() {
        let module = ModuleBuilder::new("app/M")
            .carries(names::MARKER)
            .annotate(
                Annotation::new(names::SELECT_BY_ATTRIBUTE)
                    .with(names::VALUE, ElementValue::Type("app/Y".into())),
            )
            .build();
        assert!(parse_marker(&module).is_err());
    }

    #[test]
    fn test_discover_markers_reports_and_skips() {
        let index = MetadataIndex::build(vec![
            (
                marker_module("app/Good", &Selector::ByAttribute("app/Y".into())).build(),
                Origin::Reference,
            ),
            (
                ModuleBuilder::new("app/Bad").attribute_type().carries(names::MARKER).build(),
                Origin::Input,
            ),
        ]);
        let reporter = ErrorReporter::new();
        let markers = discover_markers(&index, &reporter);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].attribute.as_str(), "app/Good");
        assert_eq!(reporter.len(), 1);
        assert_eq!(reporter.errors()[0].subject(), "app/Bad");
    }
}
