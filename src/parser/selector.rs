//! Page-body selection.
//!
//! A collection may name the element that wraps each page's body. That
//! element keeps its place in the layout but its children are lifted out into
//! the page and replaced by a single `content` node.

use crate::ast::{Attribute, Node};
use std::fmt;
use std::str::FromStr;

/// A minimal element selector: `tag`, `#id` or `.class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(String),
    Id(String),
    Class(String),
}

impl FromStr for Selector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ctor, rest): (fn(String) -> Selector, &str) = match s.as_bytes().first() {
            Some(b'#') => (Selector::Id, &s[1..]),
            Some(b'.') => (Selector::Class, &s[1..]),
            Some(_) => (|tag: String| Selector::Tag(tag.to_ascii_lowercase()), s),
            None => return Err("empty selector".into()),
        };
        if rest.is_empty() || rest.contains(char::is_whitespace) {
            return Err(format!("unsupported selector `{s}`"));
        }
        Ok(ctor(rest.to_owned()))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{tag}"),
            Self::Id(id) => write!(f, "#{id}"),
            Self::Class(class) => write!(f, ".{class}"),
        }
    }
}

impl Selector {
    pub fn matches(&self, name: &str, attrs: &[Attribute]) -> bool {
        let attr = |key: &str| {
            attrs.iter().find_map(|attr| match attr {
                Attribute::Attribute { name, value } if name == key => Some(value.as_str()),
                _ => None,
            })
        };
        match self {
            Self::Tag(tag) => name == tag,
            Self::Id(id) => attr("id") == Some(id.as_str()),
            Self::Class(class) => {
                attr("class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
            }
        }
    }
}

/// Move the children of the first element matching `selector` out of `tree`.
///
/// Returns the extracted body, or `None` when nothing matched (the tree is
/// left untouched in that case).
pub fn extract_content(tree: &mut [Node], selector: &Selector) -> Option<Vec<Node>> {
    for node in tree.iter_mut() {
        let Node::Element {
            name,
            attrs,
            children,
        } = node
        else {
            continue;
        };
        if selector.matches(name, attrs) {
            return Some(std::mem::replace(children, vec![Node::Content]));
        }
        if let Some(body) = extract_content(children, selector) {
            return Some(body);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(name: &str, attrs: Vec<Attribute>, children: Vec<Node>) -> Node {
        Node::element(name, attrs, children)
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("main".parse::<Selector>(), Ok(Selector::Tag("main".into())));
        assert_eq!("MAIN".parse::<Selector>(), Ok(Selector::Tag("main".into())));
        assert_eq!("#post".parse::<Selector>(), Ok(Selector::Id("post".into())));
        assert_eq!(".body".parse::<Selector>(), Ok(Selector::Class("body".into())));
        assert!("".parse::<Selector>().is_err());
        assert!("#".parse::<Selector>().is_err());
        assert!("div p".parse::<Selector>().is_err());
    }

    #[test]
    fn test_selector_display_round_trips() {
        for s in ["article", "#main", ".content"] {
            let selector: Selector = s.parse().unwrap();
            assert_eq!(selector.to_string(), s);
        }
    }

    #[test]
    fn test_class_matches_any_token() {
        let attrs = vec![Attribute::new("class", "post body wide")];
        assert!(Selector::Class("body".into()).matches("div", &attrs));
        assert!(!Selector::Class("bod".into()).matches("div", &attrs));
    }

    #[test]
    fn test_extract_first_match() {
        let mut tree = vec![el(
            "body",
            vec![],
            vec![
                el("nav", vec![], vec![Node::text("menu")]),
                el("main", vec![], vec![el("p", vec![], vec![Node::text("body")])]),
                el("main", vec![], vec![Node::text("second")]),
            ],
        )];

        let body = extract_content(&mut tree, &Selector::Tag("main".into()));

        assert_eq!(body, Some(vec![el("p", vec![], vec![Node::text("body")])]));
        assert_eq!(
            tree,
            vec![el(
                "body",
                vec![],
                vec![
                    el("nav", vec![], vec![Node::text("menu")]),
                    el("main", vec![], vec![Node::Content]),
                    el("main", vec![], vec![Node::text("second")]),
                ],
            )]
        );
    }

    #[test]
    fn test_extract_without_match() {
        let original = vec![el("div", vec![], vec![Node::text("x")])];
        let mut tree = original.clone();

        assert_eq!(extract_content(&mut tree, &Selector::Id("none".into())), None);
        assert_eq!(tree, original);
    }
}
