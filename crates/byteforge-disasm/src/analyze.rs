use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use serde::Serialize;

use crate::model::{decode, Image};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind { Fallthrough, Branch, CondBranch, Call }

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Fallthrough => "ft",
            EdgeKind::Branch => "br",
            EdgeKind::CondBranch => "cbr",
            EdgeKind::Call => "call",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge { pub from: usize, pub to: usize, pub kind: EdgeKind }

#[derive(Debug, Default)]
pub struct Analysis {
    pub visited: BTreeSet<usize>,
    pub widths: HashMap<usize, u8>,
    pub edges: Vec<Edge>,
    /// RET and HALT sites.
    pub exits: HashSet<usize>,
}

/// Walk reachable code from `entries`. Jump operands are offsets into the
/// program buffer, so targets are rebased onto `img.base`.
pub fn analyze_entries(img: &Image, entries: &[usize], max_instr: usize) -> Analysis {
    let mut a = Analysis::default();
    let mut queue: VecDeque<usize> = entries.iter().copied().filter(|&e| img.is_mapped(e)).collect();
    let mut steps = 0usize;
    while let Some(pc) = queue.pop_front() {
        if steps >= max_instr { break; }
        if a.visited.contains(&pc) { continue; }
        let Some(d) = decode(img, pc) else { continue; };
        steps += 1;
        a.visited.insert(pc);
        a.widths.insert(pc, d.width);
        let ft = d.next();
        let tgt = d.operand.map_or(ft, |v| img.base.wrapping_add(v as usize));
        let mut follow = |to: usize, kind: EdgeKind| {
            a.edges.push(Edge { from: pc, to, kind });
            if img.is_mapped(to) { queue.push_back(to); }
        };
        match d.mnemonic {
            "JMP" => follow(tgt, EdgeKind::Branch),
            "JZ" => {
                follow(tgt, EdgeKind::CondBranch);
                if img.is_mapped(ft) { follow(ft, EdgeKind::Fallthrough); }
            }
            "CALL" => {
                follow(tgt, EdgeKind::Call);
                if img.is_mapped(ft) { follow(ft, EdgeKind::Fallthrough); }
            }
            "RET" | "HALT" => { a.exits.insert(pc); }
            _ => {
                if img.is_mapped(ft) { follow(ft, EdgeKind::Fallthrough); }
            }
        }
    }
    a
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block { pub start: usize, pub end: usize }

#[derive(Debug, Clone, Serialize)]
pub struct EdgeOut { pub from: usize, pub to: usize, pub kind: String }

/// Split visited code into basic blocks. A block starts at an entry, a branch
/// or call target, or right after a control transfer; it ends after a JMP or an
/// exit, or before the next start.
pub fn build_blocks(a: &Analysis, seeds: &[usize]) -> Vec<Block> {
    let branching: HashSet<usize> = a.edges.iter().filter(|e| e.kind != EdgeKind::Fallthrough).map(|e| e.from).collect();
    let mut starts: BTreeSet<usize> = seeds.iter().copied().collect();
    starts.extend(a.edges.iter().filter(|e| e.kind != EdgeKind::Fallthrough || branching.contains(&e.from)).map(|e| e.to));
    let mut covered: HashSet<usize> = HashSet::new();
    let mut blocks = Vec::new();
    for &start in &starts {
        if !a.visited.contains(&start) || covered.contains(&start) { continue; }
        let mut cur = start;
        while let Some(&w) = a.widths.get(&cur) {
            covered.insert(cur);
            let next = cur.wrapping_add(w as usize);
            let is_uncond = a.edges.iter().any(|e| e.from == cur && e.kind == EdgeKind::Branch);
            let ends = is_uncond
                || a.exits.contains(&cur)
                || !a.visited.contains(&next)
                || starts.contains(&next);
            if ends {
                blocks.push(Block { start, end: next });
                break;
            }
            cur = next;
        }
    }
    blocks
}

/// Lift instruction-level edges to block starts.
pub fn block_edges(a: &Analysis, blocks: &[Block]) -> Vec<EdgeOut> {
    let block_of = |pc: usize| blocks.iter().find(|b| b.start <= pc && pc < b.end).map_or(pc, |b| b.start);
    a.edges
        .iter()
        .map(|e| EdgeOut { from: block_of(e.from), to: e.to, kind: e.kind.as_str().to_string() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteforge_asm::assemble;
    use pretty_assertions::assert_eq;

    fn image(src: &str) -> Image {
        Image::new(0, assemble(src).unwrap())
    }

    #[test]
    fn uncond_jump_skips_dead_code() {
        let img = image("JMP end\nPOP\nend: HALT");
        let a = analyze_entries(&img, &[0], 100);
        assert_eq!(a.visited.iter().copied().collect::<Vec<_>>(), vec![0, 4]);
        assert_eq!(a.edges, vec![Edge { from: 0, to: 4, kind: EdgeKind::Branch }]);
        assert!(a.exits.contains(&4));
        let blocks = build_blocks(&a, &[0]);
        assert_eq!(blocks, vec![Block { start: 0, end: 3 }, Block { start: 4, end: 5 }]);
    }

    #[test]
    fn cond_branch_and_call_keep_fallthrough() {
        let img = image("top: PUSH 0\nJZ out\nCALL sub\nJMP top\nout: HALT\nsub: RET");
        let a = analyze_entries(&img, &[0], 100);
        // PUSH(9) JZ(3) CALL(3) JMP(3) HALT(1) RET(1)
        assert!(a.edges.contains(&Edge { from: 9, to: 18, kind: EdgeKind::CondBranch }));
        assert!(a.edges.contains(&Edge { from: 9, to: 12, kind: EdgeKind::Fallthrough }));
        assert!(a.edges.contains(&Edge { from: 12, to: 19, kind: EdgeKind::Call }));
        assert!(a.edges.contains(&Edge { from: 15, to: 0, kind: EdgeKind::Branch }));
        assert_eq!(a.visited.len(), 6);

        let blocks = build_blocks(&a, &[0]);
        let starts: Vec<usize> = blocks.iter().map(|b| b.start).collect();
        assert_eq!(starts, vec![0, 12, 15, 18, 19]);
        let edges = block_edges(&a, &blocks);
        assert!(edges.iter().any(|e| e.from == 12 && e.to == 19 && e.kind == "call"));
    }

    #[test]
    fn no_fallthrough_past_image_end() {
        let img = image("JMP main\nsub: RET\nmain: CALL sub");
        let a = analyze_entries(&img, &[0], 100);
        assert!(a.edges.contains(&Edge { from: 4, to: 3, kind: EdgeKind::Call }));
        assert!(!a.edges.iter().any(|e| e.from == 4 && e.kind == EdgeKind::Fallthrough));

        let img = image("PUSH 0\nJZ 0");
        let a = analyze_entries(&img, &[0], 100);
        assert_eq!(a.edges.iter().filter(|e| e.from == 9).count(), 1);
    }

    #[test]
    fn walk_at_top_of_address_space() {
        let img = Image::new(usize::MAX, vec![0xFF]);
        let a = analyze_entries(&img, &[usize::MAX], 10);
        assert!(a.exits.contains(&usize::MAX));
        assert_eq!(build_blocks(&a, &[usize::MAX]), vec![Block { start: usize::MAX, end: 0 }]);
    }

    #[test]
    fn step_cap_stops_the_walk() {
        let img = image("POP\nPOP\nPOP\nHALT");
        let a = analyze_entries(&img, &[0], 2);
        assert_eq!(a.visited.len(), 2);
    }
}
