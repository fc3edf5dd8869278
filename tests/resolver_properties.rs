//! Property-based tests for the classifier and resolver
//!
//! Names are drawn from a small alphabet so generated registries and prefixes
//! overlap often enough to exercise both hits and misses.

use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

use markdoc_language_server::lsp::config::{FlatSymbols, SymbolSource};
use markdoc_language_server::lsp::features::completion::{classify, resolve, CompletionContext, ResolutionFailure};
use markdoc_language_server::lsp::models::ErrorType;
use markdoc_language_server::lsp::symbol_registry::Symbols;

const FIRST: &[char] = &['a', 'b', 'c'];
const REST: &[char] = &['a', 'b', 'c', '_', '-', '1'];

/// A valid symbol name starting with a letter
#[derive(Clone, Debug, PartialEq, Eq)]
struct Name(String);

impl Arbitrary for Name {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % 4;
        let mut name = String::new();
        name.push(*g.choose(FIRST).unwrap());
        for _ in 0..len {
            name.push(*g.choose(REST).unwrap());
        }
        Name(name)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let name = self.0.clone();
        Box::new((1..name.len()).rev().map(move |len| Name(name[..len].to_string())))
    }
}

/// A possibly empty prefix over the same alphabet
#[derive(Clone, Debug)]
struct Prefix(String);

impl Arbitrary for Prefix {
    fn arbitrary(g: &mut Gen) -> Self {
        if bool::arbitrary(g) {
            return Prefix(String::new());
        }
        Prefix(Name::arbitrary(g).0)
    }
}

/// A generated flat registry
#[derive(Clone, Debug)]
struct Registry {
    tags: Vec<String>,
    functions: Vec<String>,
    attributes: Vec<(String, Vec<String>)>,
}

impl Registry {
    fn symbols(&self) -> Symbols {
        let source = SymbolSource::Flat(FlatSymbols {
            tags: self.tags.clone(),
            functions: self.functions.clone(),
            attributes: self.attributes.iter().cloned().collect(),
        });
        Symbols::from_source(&source).unwrap()
    }
}

impl Arbitrary for Registry {
    fn arbitrary(g: &mut Gen) -> Self {
        let names = |g: &mut Gen| -> Vec<String> { Vec::<Name>::arbitrary(g).into_iter().map(|n| n.0).collect() };
        let tags = names(g);
        let mut attributes = Vec::new();
        for tag in &tags {
            if bool::arbitrary(g) {
                attributes.push((tag.clone(), names(g)));
            }
        }
        Registry { tags, functions: names(g), attributes }
    }
}

#[test]
fn test_tag_resolution_is_the_prefix_subset() {
    fn prop(registry: Registry, prefix: Prefix) -> bool {
        let symbols = registry.symbols();
        let context = CompletionContext::Tag { partial: prefix.0.clone() };

        let mut expected: Vec<String> = Vec::new();
        for tag in &registry.tags {
            if tag.starts_with(&prefix.0) && !expected.contains(tag) {
                expected.push(tag.clone());
            }
        }

        match resolve(&context, &symbols) {
            Ok(candidates) => {
                !expected.is_empty() && candidates.into_iter().map(|c| c.label).collect::<Vec<_>>() == expected
            }
            Err(failure) => expected.is_empty() && failure.error_type() == ErrorType::TagMissing,
        }
    }
    QuickCheck::new().tests(200).quickcheck(prop as fn(Registry, Prefix) -> bool);
}

#[test]
fn test_attributes_of_unknown_tags_fail_with_tag_missing() {
    fn prop(registry: Registry, tag: Name, prefix: Prefix) -> TestResult {
        if registry.tags.contains(&tag.0) {
            return TestResult::discard();
        }
        let context = CompletionContext::Attribute { tag: tag.0, partial: prefix.0 };
        let failure = resolve(&context, &registry.symbols());
        TestResult::from_bool(matches!(
            failure,
            Err(ResolutionFailure::TagMissing { as_attribute_host: true, .. })
        ))
    }
    QuickCheck::new().tests(200).max_tests(2000).quickcheck(prop as fn(Registry, Name, Prefix) -> TestResult);
}

#[test]
fn test_tags_without_attributes_fail_with_attribute_missing() {
    fn prop(mut registry: Registry, tag: Name, prefix: Prefix) -> bool {
        registry.attributes.retain(|(name, _)| *name != tag.0);
        registry.tags.push(tag.0.clone());

        let context = CompletionContext::Attribute { tag: tag.0, partial: prefix.0 };
        resolve(&context, &registry.symbols()).map_err(|f| f.error_type()) == Err(ErrorType::AttributeMissing)
    }
    QuickCheck::new().tests(200).quickcheck(prop as fn(Registry, Name, Prefix) -> bool);
}

#[test]
fn test_resolution_is_idempotent() {
    fn prop(registry: Registry, tag: Name, prefix: Prefix) -> bool {
        let symbols = registry.symbols();
        let contexts = [
            CompletionContext::Tag { partial: prefix.0.clone() },
            CompletionContext::Function { partial: prefix.0.clone() },
            CompletionContext::Attribute { tag: tag.0.clone(), partial: prefix.0.clone() },
        ];
        contexts
            .iter()
            .all(|context| resolve(context, &symbols) == resolve(context, &symbols))
    }
    QuickCheck::new().tests(100).quickcheck(prop as fn(Registry, Name, Prefix) -> bool);
}

#[test]
fn test_classifier_partial_is_the_typed_text() {
    fn prop(tag: Name, attribute: Name, function: Name) -> bool {
        let tag_start = "{% ".len();
        let tag_text = format!("{{% {}", tag.0);
        let tag_ok = (tag_start..=tag_text.len())
            .all(|offset| classify(&tag_text, offset) == Some(CompletionContext::Tag { partial: tag_text[tag_start..offset].to_string() }));

        let attribute_prefix = format!("Some text {{% {} ", tag.0);
        let attribute_text = format!("{}{} %}}", attribute_prefix, attribute.0);
        let attribute_ok = (attribute_prefix.len()..=attribute_prefix.len() + attribute.0.len()).all(|offset| {
            classify(&attribute_text, offset)
                == Some(CompletionContext::Attribute {
                    tag: tag.0.clone(),
                    partial: attribute_text[attribute_prefix.len()..offset].to_string(),
                })
        });

        let function_prefix = format!("{{% {} x=", tag.0);
        let function_text = format!("{}{}($v)", function_prefix, function.0);
        let function_ok = (function_prefix.len()..=function_prefix.len() + function.0.len()).all(|offset| {
            classify(&function_text, offset)
                == Some(CompletionContext::Function {
                    partial: function_text[function_prefix.len()..offset].to_string(),
                })
        });

        tag_ok && attribute_ok && function_ok
    }
    QuickCheck::new().tests(200).quickcheck(prop as fn(Name, Name, Name) -> bool);
}

#[test]
fn test_plain_text_never_classifies() {
    fn prop(words: Vec<Name>) -> bool {
        let text = words.iter().map(|w| w.0.as_str()).collect::<Vec<_>>().join(" ");
        (0..=text.len()).all(|offset| classify(&text, offset).is_none())
    }
    QuickCheck::new().tests(100).quickcheck(prop as fn(Vec<Name>) -> bool);
}
