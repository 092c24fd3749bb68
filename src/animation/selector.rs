// Element selectors for animation targets: `tag`, `*`, `#id`, `.class`,
// descendant and `>` child combinators, comma separated alternatives.

use super::document::{NodeId, SvgDocument};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    pub fn parse(text: &str) -> Result<Self, String> {
        let alternatives = text
            .split(',')
            .map(parse_complex)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    pub fn matches(&self, doc: &SvgDocument, node: NodeId) -> bool {
        self.alternatives.iter().any(|complex| {
            let last = complex.compounds.len() - 1;
            complex.matches_at(doc, node, last)
        })
    }

    /// Every matching element, in document order.
    pub fn select(&self, doc: &SvgDocument) -> Vec<NodeId> {
        doc.element_ids().filter(|id| self.matches(doc, *id)).collect()
    }
}

impl Complex {
    fn matches_at(&self, doc: &SvgDocument, node: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, index - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches(&self, doc: &SvgDocument, node: NodeId) -> bool {
        let Some(element) = doc.element(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|tag| tag != element.name) {
            return false;
        }
        if self.id.is_some() && self.id.as_deref() != element.attribute("id") {
            return false;
        }
        let classes = element.attribute("class").unwrap_or_default();
        self.classes
            .iter()
            .all(|wanted| classes.split_whitespace().any(|c| c == wanted))
    }
}

fn parse_complex(text: &str) -> Result<Complex, String> {
    let spaced = text.replace('>', " > ");
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut pending = None;

    for token in spaced.split_whitespace() {
        if token == ">" {
            if compounds.is_empty() || pending.is_some() {
                return Err("misplaced `>`".to_string());
            }
            pending = Some(Combinator::Child);
            continue;
        }
        if !compounds.is_empty() {
            combinators.push(pending.take().unwrap_or(Combinator::Descendant));
        }
        compounds.push(parse_compound(token)?);
    }

    if compounds.is_empty() {
        return Err("empty selector".to_string());
    }
    if pending.is_some() {
        return Err("selector ends with `>`".to_string());
    }
    Ok(Complex {
        compounds,
        combinators,
    })
}

fn parse_compound(token: &str) -> Result<Compound, String> {
    let mut compound = Compound::default();
    let mut rest = token;

    if let Some(stripped) = rest.strip_prefix('*') {
        rest = stripped;
    } else {
        let end = ident_end(rest);
        if end > 0 {
            compound.tag = Some(rest[..end].to_string());
            rest = &rest[end..];
        }
    }

    while let Some(marker) = rest.chars().next() {
        let body = &rest[marker.len_utf8()..];
        let end = ident_end(body);
        if end == 0 {
            return Err(format!("expected a name after `{}` in `{}`", marker, token));
        }
        let name = body[..end].to_string();
        match marker {
            '#' if compound.id.is_none() => compound.id = Some(name),
            '#' => return Err(format!("more than one id in `{}`", token)),
            '.' => compound.classes.push(name),
            other => return Err(format!("unsupported `{}` in `{}`", other, token)),
        }
        rest = &body[end..];
    }

    Ok(compound)
}

fn ident_end(text: &str) -> usize {
    text.find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(text.len())
}
