use std::slice;

use super::{HeadingItem, HeadingSource};
use crate::model::Candidate;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageRef {
    Object(u32, u16),
    Named(String),
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineNode {
    Leaf { title: String, target: PageRef },
    Group(Vec<OutlineNode>),
}

impl OutlineNode {
    pub fn leaf(title: impl Into<String>, target: PageRef) -> Self {
        Self::Leaf {
            title: title.into(),
            target,
        }
    }
}

pub trait PageResolver {
    fn resolve(&self, target: &PageRef) -> Option<usize>;
}

impl<F> PageResolver for F
where
    F: Fn(&PageRef) -> Option<usize>,
{
    fn resolve(&self, target: &PageRef) -> Option<usize> {
        self(target)
    }
}

pub struct OutlineWalk<'a> {
    stack: Vec<slice::Iter<'a, OutlineNode>>,
}

impl<'a> OutlineWalk<'a> {
    pub fn new(nodes: &'a [OutlineNode]) -> Self {
        Self {
            stack: vec![nodes.iter()],
        }
    }
}

impl<'a> Iterator for OutlineWalk<'a> {
    type Item = (&'a str, &'a PageRef);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(level) = self.stack.last_mut() {
            match level.next() {
                Some(OutlineNode::Leaf { title, target }) => return Some((title.as_str(), target)),
                Some(OutlineNode::Group(children)) => self.stack.push(children.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

pub struct OutlineHeadings<R> {
    nodes: Vec<OutlineNode>,
    resolver: R,
}

impl<R: PageResolver> OutlineHeadings<R> {
    pub fn new(nodes: Vec<OutlineNode>, resolver: R) -> Self {
        Self { nodes, resolver }
    }

    pub fn entry_count(&self) -> usize {
        OutlineWalk::new(&self.nodes).count()
    }
}

impl<R: PageResolver> HeadingSource for OutlineHeadings<R> {
    fn name(&self) -> &'static str {
        "outline"
    }

    fn items(&self) -> Box<dyn Iterator<Item = HeadingItem> + '_> {
        Box::new(
            OutlineWalk::new(&self.nodes).map(|(title, target)| {
                match self.resolver.resolve(target) {
                    Some(page_index) => {
                        HeadingItem::Found(Candidate::new(title.trim(), page_index as i64))
                    }
                    None => HeadingItem::Skipped {
                        page_index: None,
                        reason: format!("outline entry '{}' has no resolvable page", title),
                    },
                }
            }),
        )
    }
}
