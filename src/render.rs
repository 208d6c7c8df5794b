//! Graphviz rendering of typed term graphs.

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::PathBuf;

use dot_writer::Attributes;
use dot_writer::DotWriter;
use maud::PreEscaped;

use crate::data::bitset::BitSet;
use crate::data::{Addr, Heap, Word};
use crate::term::{self, NodeKind, Shape, TermError};
use crate::types::{Statics, TypeInfo};

fn node_for_addr(addr: Addr) -> String {
    format!(r#"<{addr}>"#)
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderStats {
    /// Heap objects drawn.
    pub objects: usize,
    /// Pointers drawn between them, one per pointer field.
    pub edges: usize,
}

/// A value to draw, with the name to label it with.
pub struct Root<'a> {
    pub label: &'a str,
    pub value: Word,
    pub type_info: TypeInfo,
}

/// Where a field of a node points.
enum Field {
    Text(String),
    Object(Addr),
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Text(text) => write!(f, "{text}"),
            Field::Object(addr) => write!(f, "{addr}"),
        }
    }
}

/// How to draw a field, and the object to draw next if it points to one.
fn field_text(
    heap: &Heap,
    statics: &Statics,
    value: Word,
    type_info: &TypeInfo,
) -> Result<(Field, Option<(Word, TypeInfo)>), TermError> {
    Ok(match term::expose(heap, statics, value, type_info)? {
        Shape::Leaf(t) => (Field::Text(t.to_string()), None),
        Shape::Node {
            addr: Some(addr), ..
        } => (Field::Object(addr), Some((value, type_info.clone()))),
        Shape::Node { addr: None, .. } => (
            Field::Text(term::show(heap, statics, value, type_info)),
            None,
        ),
    })
}

fn render_node(
    heap: &Heap,
    statics: &Statics,
    labels: &HashMap<Addr, &str>,
    graph: &mut dot_writer::Scope,
    addr: Addr,
    kind: &NodeKind,
    args: &[(Word, TypeInfo)],
) -> Result<(usize, Vec<(Word, TypeInfo)>), TermError> {
    let mut fields = Vec::new();
    let mut next = Vec::new();
    for (w, t) in args {
        let (field, successor) = field_text(heap, statics, *w, t)?;
        fields.push(field);
        next.extend(successor);
    }

    let mut node = graph.node_named(node_for_addr(addr));
    node.set_shape(dot_writer::Shape::None);
    let label = labels.get(&addr).copied().unwrap_or("");
    let rows = maud::html!(
        @for (i, field) in fields.iter().enumerate() {
            tr {
                td { (i) }
                td port=(format!("port{i}")) { (field) }
            }
        }
    );
    let table: PreEscaped<String> = maud::html!(
        table {
            tr { td border="0" colspan="2" { (addr) } }
            @if !label.is_empty() {
                tr { td border="0" colspan="2" align="text" { b { (label) } } }
            }
            tr { td border="0" colspan="2" { i { (kind) } } }
            (rows)
        }
    );
    node.set_html(&format!("<{}>", table.into_string()));
    let node_id = node.id();
    std::mem::drop(node);

    let mut edges = 0;
    for (i, field) in fields.iter().enumerate() {
        if let Field::Object(to) = field {
            graph.edge(node_id.port(&format!("port{i}")), node_for_addr(*to));
            edges += 1;
        }
    }
    Ok((edges, next))
}

/// Renders the objects reachable from `roots` as a Graphviz digraph.
///
/// Each heap object is drawn once, however many paths lead to it;
/// values that are not heap objects are drawn inline in their parent.
pub fn render_terms(
    heap: &Heap,
    statics: &Statics,
    roots: &[Root<'_>],
) -> Result<(RenderStats, Vec<u8>), TermError> {
    let mut stats = RenderStats::default();
    let mut visited = BitSet::new();
    let mut outbuf = Vec::new();
    {
        let mut writer = DotWriter::from(&mut outbuf);
        let mut graph = writer.digraph();
        graph.node_attributes().set_font("monospace");

        let mut labels = HashMap::new();
        let mut queue = VecDeque::new();
        for root in roots {
            match term::expose(heap, statics, root.value, &root.type_info)? {
                Shape::Node {
                    addr: Some(addr), ..
                } => {
                    labels.insert(addr, root.label);
                    queue.push_back((root.value, root.type_info.clone()));
                }
                _ => {
                    // Not a heap object: draw it on its own.
                    let text = term::show(heap, statics, root.value, &root.type_info);
                    let mut node = graph.node_auto();
                    node.set_shape(dot_writer::Shape::None);
                    node.set_html(&format!(
                        "<{}>",
                        maud::html!(table { tr { td border="0" { b { (root.label) } } } tr { td { (text) } } })
                            .into_string()
                    ));
                }
            }
        }

        while let Some((value, type_info)) = queue.pop_front() {
            let Shape::Node {
                addr: Some(addr),
                kind,
                args,
            } = term::expose(heap, statics, value, &type_info)?
            else {
                continue;
            };
            if !visited.set(addr) {
                continue;
            }
            stats.objects += 1;
            let (edges, next) =
                render_node(heap, statics, &labels, &mut graph, addr, &kind, &args)?;
            stats.edges += edges;
            queue.extend(next);
        }
    }
    Ok((stats, outbuf))
}

/// Keeps a copy of DOT source in a temporary file, returning its path.
pub fn save_graph(gv: &[u8]) -> Option<PathBuf> {
    tempfile::NamedTempFile::new()
        .and_then(|mut f| {
            f.write_all(gv)?;
            let (_, pathbuf) = f.keep()?;
            Ok(pathbuf)
        })
        .inspect(|pathbuf| tracing::info!("DOT source in {}", pathbuf.display()))
        .map_err(|e| tracing::warn!("could not save DOT source: {e}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_objects_are_drawn_once() {
        let statics = Statics::new();
        let b = statics.builtins();
        let mut heap = Heap::new();
        let s = heap.put_string("shared");
        let pair = heap.put_tuple(&[s, s]);
        let string = TypeInfo::atom(b.string);
        let t = TypeInfo::new(b.tuple, [string.clone(), string]);

        let (stats, gv) = render_terms(
            &heap,
            &statics,
            &[Root {
                label: "pair",
                value: pair,
                type_info: t,
            }],
        )
        .unwrap();
        // Strings are drawn inline, so only the tuple is a node.
        assert_eq!(stats, RenderStats { objects: 1, edges: 0 });
        let gv = String::from_utf8(gv).unwrap();
        assert!(gv.starts_with("digraph"));
        assert!(gv.contains("pair"));
        assert!(gv.contains("shared"));
    }

    #[test]
    fn edges_between_objects() {
        let statics = Statics::new();
        let b = statics.builtins();
        let mut heap = Heap::new();
        let int = TypeInfo::atom(b.int);
        let inner = heap.put_tuple(&[Word::from_int(1), Word::from_int(2)]);
        let inner_t = TypeInfo::new(b.tuple, [int.clone(), int]);
        let outer = heap.put_tuple(&[inner, inner]);
        let outer_t = TypeInfo::new(b.tuple, [inner_t.clone(), inner_t]);

        let (stats, _) = render_terms(
            &heap,
            &statics,
            &[Root {
                label: "outer",
                value: outer,
                type_info: outer_t,
            }],
        )
        .unwrap();
        assert_eq!(stats, RenderStats { objects: 2, edges: 2 });
    }

    #[test]
    fn edges_count_every_pointer_drawn() {
        let statics = Statics::new();
        let b = statics.builtins();
        let mut heap = Heap::new();
        let int = TypeInfo::atom(b.int);
        let leaf = heap.put_tuple(&[Word::from_int(7)]);
        let leaf_t = TypeInfo::new(b.tuple, [int]);
        let left = heap.put_tuple(&[leaf]);
        let right = heap.put_tuple(&[leaf]);
        let branch_t = TypeInfo::new(b.tuple, [leaf_t]);
        let top = heap.put_tuple(&[left, right]);
        let top_t = TypeInfo::new(b.tuple, [branch_t.clone(), branch_t.clone()]);

        let (stats, gv) = render_terms(
            &heap,
            &statics,
            &[
                Root {
                    label: "top",
                    value: top,
                    type_info: top_t,
                },
                Root {
                    label: "unit",
                    value: Word::from_int(3),
                    type_info: TypeInfo::atom(b.int),
                },
            ],
        )
        .unwrap();
        // The shared leaf is one node with two incoming edges; the
        // inline root adds a node but no edges.
        assert_eq!(stats, RenderStats { objects: 4, edges: 4 });
        let gv = String::from_utf8(gv).unwrap();
        assert_eq!(gv.matches("->").count(), 4);
    }
}
