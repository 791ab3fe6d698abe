//! Reading and writing games in the PGSolver text format.
//!
//! ```text
//! parity 3;
//! start 0;
//! 0 1 0 1,2 "a";
//! 1 2 1 0;
//! ...
//! ```
//!
//! Each line declares `id priority owner successors ["name"];`. Owner `1` (odd) is our player,
//! owner `0` is the environment. Priorities move to edges: every outgoing edge of a vertex is
//! colored with the vertex priority plus two, which keeps the parity and makes every color
//! at least `2`. Vertex ids may be sparse; they are mapped to arena vertices in increasing
//! order. Without a `start` line, the smallest id is initial.

use crate::arena::{Arena, ENV, MAX_COLOR, PLAYER};
use crate::error::ParseError;
use biodivine_lib_bdd::BddVariableSet;
use std::collections::BTreeMap;
use std::fmt::Write;

/// A parsed vertex declaration.
struct Declaration {
    /// The vertex priority shifted by two.
    color: u32,
    owner: bool,
    successors: Vec<u32>,
}

/// Parse a game in the PGSolver format into an arena without guards (every guard is `true`).
pub fn parse_pgsolver(input: &str) -> Result<Arena, ParseError> {
    let mut declarations: BTreeMap<u32, Declaration> = BTreeMap::new();
    let mut start: Option<u32> = None;

    for (index, raw_line) in input.lines().enumerate() {
        let line_number = index + 1;
        let syntax = |message: &str| ParseError::Syntax {
            line: line_number,
            message: message.to_string(),
        };

        // Strip the optional quoted name and the terminating semicolon.
        let line = raw_line.split('"').next().unwrap_or("").trim();
        let line = line.trim_end_matches(';').trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(head) = tokens.next() else {
            continue;
        };
        match head {
            "parity" => continue,
            "start" => {
                let id = tokens
                    .next()
                    .and_then(|t| t.parse::<u32>().ok())
                    .ok_or_else(|| syntax("expected a vertex id after `start`"))?;
                start = Some(id);
            }
            _ => {
                let id = head
                    .parse::<u32>()
                    .map_err(|_| syntax("expected a vertex id"))?;
                let priority = tokens
                    .next()
                    .and_then(|t| t.parse::<u32>().ok())
                    .ok_or_else(|| syntax("expected a priority"))?;
                let color = priority
                    .checked_add(2)
                    .filter(|color| *color <= MAX_COLOR)
                    .ok_or_else(|| syntax("priority is too large"))?;
                let owner = match tokens.next() {
                    Some("0") => ENV,
                    Some("1") => PLAYER,
                    _ => return Err(syntax("expected owner `0` or `1`")),
                };
                let successors = tokens
                    .next()
                    .ok_or_else(|| syntax("expected a successor list"))?
                    .split(',')
                    .map(|t| t.trim().parse::<u32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| syntax("invalid successor list"))?;
                let declaration = Declaration {
                    color,
                    owner,
                    successors,
                };
                if declarations.insert(id, declaration).is_some() {
                    return Err(ParseError::DuplicateVertex(id));
                }
            }
        }
    }

    let Some(first) = declarations.keys().next().copied() else {
        return Err(ParseError::Empty);
    };

    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    let mut vertex_of = BTreeMap::new();
    for (id, declaration) in &declarations {
        vertex_of.insert(*id, arena.add_vertex(declaration.owner));
    }
    for (id, declaration) in &declarations {
        let src = vertex_of[id];
        for succ in &declaration.successors {
            let Some(dst) = vertex_of.get(succ) else {
                return Err(ParseError::UndeclaredVertex(*succ));
            };
            arena.add_plain_edge(src, *dst, declaration.color);
        }
    }

    let start = start.unwrap_or(first);
    let Some(init) = vertex_of.get(&start) else {
        return Err(ParseError::UndeclaredVertex(start));
    };
    arena.set_init(*init);
    Ok(arena)
}

/// Write `arena` in the PGSolver format.
///
/// Colors move back to vertices: each vertex gets the largest color of its outgoing edges as
/// priority. This is exact for arenas read by [`parse_pgsolver`] (up to the shift by two,
/// which preserves the winner) and an approximation for arbitrary edge-colored arenas.
pub fn write_pgsolver(arena: &Arena) -> String {
    let mut output = String::new();
    let max_id = arena.num_vertices().saturating_sub(1);
    let _ = writeln!(output, "parity {max_id};");
    let _ = writeln!(output, "start {};", arena.init());
    for v in 0..arena.num_vertices() as u32 {
        let priority = arena.out(v).map(|(_, e)| e.color).max().unwrap_or(0);
        let owner = u8::from(arena.owner(v));
        let successors = arena
            .out(v)
            .map(|(_, e)| e.dst.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(output, "{v} {priority} {owner} {successors};");
    }
    output
}

/// Write the solution of a solved arena in the PGSolver solution format
/// (`id winner [strategy];`, winner `1` means the player wins).
///
/// Returns `None` if the arena is not solved.
pub fn write_solution(arena: &Arena) -> Option<String> {
    let solution = arena.solution()?;
    let mut output = String::new();
    let max_id = arena.num_vertices().saturating_sub(1);
    let _ = writeln!(output, "paritysol {max_id};");
    for v in 0..arena.num_vertices() {
        let winner = u8::from(solution.winner[v]);
        match solution.strategy[v] {
            Some(edge) => {
                let _ = writeln!(output, "{v} {winner} {};", arena.edge(edge).dst);
            }
            None => {
                let _ = writeln!(output, "{v} {winner};");
            }
        }
    }
    Some(output)
}
