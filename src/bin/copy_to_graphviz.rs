//! Build a small term graph, copy the newer part of it, and draw both as Graphviz.
//!
//! The original and the copy share everything built before the mark;
//! everything after it appears twice.
//!
//! Usage:
//!
//! ```ignore
//! copy_to_graphviz | dot -T png >output.png
//! ```
//!
//! Set `TERMCOPY_SAVE_GRAPH` to also keep the DOT source in a temporary file.

use std::io::Write;

use termcopy::copy::{Copier, Region};
use termcopy::data::{Heap, Word};
use termcopy::types::{
    DuFunctorDesc, DuLayout, PseudoTypeInfo, PtagLayout, SectagLocn, Statics, TypeCtorId,
    TypeCtorRep, TypeInfo,
};
use termcopy::{render_terms, save_graph, Root};

const NIL: Word = Word::from_bits(0);

fn declare_list(statics: &mut Statics) -> TypeCtorId {
    let list = statics.declare_type_ctor("list", "list", 1);
    let nil = statics.intern("[]");
    let cons = statics.intern("[|]");
    let tail = PseudoTypeInfo::new(list, [PseudoTypeInfo::Var(1)]);
    statics.define_type_ctor(
        list,
        TypeCtorRep::Du(DuLayout {
            ptags: vec![
                PtagLayout {
                    sectag_locn: SectagLocn::Local,
                    alternatives: vec![DuFunctorDesc::new(nil, 0, 0, vec![])],
                },
                PtagLayout {
                    sectag_locn: SectagLocn::None,
                    alternatives: vec![DuFunctorDesc::new(
                        cons,
                        1,
                        0,
                        vec![PseudoTypeInfo::Var(1), tail],
                    )],
                },
            ],
        }),
    );
    list
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut statics = Statics::new();
    let list = declare_list(&mut statics);
    let strings = TypeInfo::new(list, [TypeInfo::atom(statics.builtins().string)]);
    let t = TypeInfo::new(statics.builtins().tuple, [strings.clone(), strings]);

    let mut heap = Heap::new();
    let shared = heap.put_string("shared");
    let old_tail = heap.put_cell(1, &[shared, NIL]);
    let mark = heap.mark();
    let fresh = heap.put_string("fresh");
    let middle = heap.put_cell(1, &[shared, old_tail]);
    let names = heap.put_cell(1, &[fresh, middle]);
    let pair = heap.put_tuple(&[names, names]);

    let region = Region::since(mark, &heap);
    let mut copier = Copier::new(&mut heap, &statics, region);
    let copied = copier.copy(pair, &t).expect("error: copy failed");
    let stats = copier.finish_and_restore();
    tracing::info!(
        "copied {} objects ({} words); {} already copied, {} outside the region",
        stats.objects_copied,
        stats.words_allocated,
        stats.forwarded_hits,
        stats.out_of_range
    );

    let (render_stats, gv) = render_terms(
        &heap,
        &statics,
        &[
            Root {
                label: "original",
                value: pair,
                type_info: t.clone(),
            },
            Root {
                label: "copy",
                value: copied,
                type_info: t,
            },
        ],
    )
    .expect("error: could not render heap");
    tracing::debug!("rendered {render_stats:?}");

    if std::env::var_os("TERMCOPY_SAVE_GRAPH").is_some() {
        save_graph(&gv);
    }
    std::io::stdout()
        .lock()
        .write_all(&gv)
        .expect("error: could not write output");
}
