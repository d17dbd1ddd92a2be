//! Misuse of named capturing groups.
//!
//! Three rules share the named-group table of one pattern: a group
//! accessor naming a group that does not exist, a numeric access to a
//! group that has a perfectly good name, and names that were declared
//! but never used anywhere. All three stay silent for patterns without
//! named groups.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::automaton::{NodeKind, RegexParseResult, TextRange};
use crate::checks::CheckContext;
use crate::flow::{AccessorMethod, GroupArg, PatternUsage, UsageOrigin};
use crate::report::{CheckId, FindingSink};

const USE_OR_REMOVE: &str = "Use the named groups of this regex or remove the names.";

struct NamedGroup {
    name: String,
    number: u32,
    range: TextRange,
}

pub fn run(
    _ctx: &CheckContext<'_>,
    parse: &RegexParseResult,
    usage: &PatternUsage,
    sink: &mut FindingSink,
) {
    if parse.has_syntax_errors() {
        return;
    }
    let named = named_groups(parse);
    if named.is_empty() {
        return;
    }
    let names: FxHashSet<&str> = named.iter().map(|group| group.name.as_str()).collect();
    let numbers: FxHashMap<u32, &NamedGroup> =
        named.iter().map(|group| (group.number, group)).collect();

    let mut groups_accessed = false;
    for method in &usage.invocations {
        if matches!(
            method,
            AccessorMethod::Group(_) | AccessorMethod::Start(_) | AccessorMethod::End(_)
        ) {
            groups_accessed = true;
        }
        match method.group_arg() {
            Some(GroupArg::Name(name)) if !names.contains(name.as_str()) => {
                sink.report(
                    CheckId::GroupUsage,
                    parse.automaton.range(parse.root),
                    format!("There is no group named '{name}' in the regular expression."),
                    None,
                    named_secondaries(&named),
                );
            }
            Some(GroupArg::Number(number)) if !usage.escaped => {
                if let Some(group) = numbers.get(number) {
                    sink.report(
                        CheckId::GroupUsage,
                        group.range,
                        format!("Directly use '{}' instead of its group number.", group.name),
                        None,
                        vec![(group.range, format!("Group {number}"))],
                    );
                }
            }
            _ => {}
        }
    }

    // Names nobody reads are dead weight, unless a back-reference uses
    // them inside the pattern or the value escaped our sight.
    if !groups_accessed
        && usage.is_exhaustive()
        && usage.origin == UsageOrigin::MethodCall
        && !parse.automaton.contains_back_reference()
    {
        sink.report(
            CheckId::GroupUsage,
            named[0].range,
            USE_OR_REMOVE,
            None,
            named_secondaries(&named),
        );
    }
}

/// Named capturing groups of the pattern in source order.
fn named_groups(parse: &RegexParseResult) -> Vec<NamedGroup> {
    let automaton = &parse.automaton;
    let mut named: Vec<NamedGroup> = automaton
        .ids()
        .filter_map(|id| match automaton.kind(id) {
            NodeKind::CapturingGroup {
                name: Some(name),
                number,
                ..
            } => Some(NamedGroup {
                name: name.clone(),
                number: *number,
                range: automaton.range(id),
            }),
            _ => None,
        })
        .collect();
    named.sort_by_key(|group| (group.range.start, group.number));
    named
}

fn named_secondaries(named: &[NamedGroup]) -> Vec<(TextRange, String)> {
    named
        .iter()
        .map(|group| (group.range, format!("Named group '{}'", group.name)))
        .collect()
}
