/// Output formatting: terminal tables and JSON.
use mostest_core::{Candidate, CandidatePair, Leaderboard, RankedCandidate};
use mostest_store::LeaderboardSummary;
use serde::Serialize;

use crate::bail;

#[derive(Serialize)]
struct JsonRanking<'a> {
    leaderboard: &'a Leaderboard,
    candidates: &'a [RankedCandidate],
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    leaderboard: &'a Leaderboard,
    votes: u64,
    preview: &'a [Candidate],
}

fn print_json(value: &impl Serialize) {
    let text = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| bail(format!("Failed to serialize output: {e}")));
    println!("{text}");
}

/// Score with as many decimals as fit: "100", "66.7", "4.76".
pub fn format_percent(score: f64) -> String {
    if score >= 100.0 {
        format!("{score:.0}%")
    } else if score >= 10.0 {
        format!("{score:.1}%")
    } else {
        format!("{score:.2}%")
    }
}

/// Print a ranking as a formatted terminal table.
pub fn print_ranking_table(leaderboard: &Leaderboard, ranking: &[RankedCandidate]) {
    println!("{} ({})", leaderboard.name, leaderboard.slug);
    println!("{}\n", leaderboard.question);

    if ranking.is_empty() {
        println!("No candidates yet.");
        return;
    }

    let name_width = ranking
        .iter()
        .map(|r| r.candidate.name.chars().count())
        .max()
        .unwrap_or(9)
        .max(9); // at least "Candidate"

    println!(" # | {:<name_width$} |   Score | Wins | Losses", "Candidate");
    println!("---|-{}-|---------|------|-------", "-".repeat(name_width));
    for r in ranking {
        println!(
            "{:>2} | {:<name_width$} | {:>7} | {:>4} | {:>6}",
            r.position,
            r.candidate.name,
            format_percent(r.score),
            r.wins,
            r.losses,
        );
    }

    let votes: u64 = ranking.iter().map(|r| r.wins).sum();
    println!("\n{} candidates, {} votes", ranking.len(), votes);
}

pub fn print_ranking_json(leaderboard: &Leaderboard, ranking: &[RankedCandidate]) {
    print_json(&JsonRanking { leaderboard, candidates: ranking });
}

pub fn print_pair(leaderboard: &Leaderboard, (a, b): &CandidatePair) {
    println!("{}", leaderboard.question);
    println!("  1) {}  [{}]", a.name, a.id);
    println!("  2) {}  [{}]", b.name, b.id);
}

pub fn print_pair_json((a, b): &CandidatePair) {
    print_json(&[a, b]);
}

pub fn print_candidates(candidates: &[Candidate]) {
    for c in candidates {
        match &c.image {
            Some(image) => println!("{}  {}  {}", c.id, c.name, image),
            None => println!("{}  {}", c.id, c.name),
        }
    }
}

/// Print leaderboard listings (featured, mine).
pub fn print_summaries(summaries: &[LeaderboardSummary]) {
    if summaries.is_empty() {
        println!("No leaderboards.");
        return;
    }
    for s in summaries {
        let preview: Vec<&str> = s.preview.iter().map(|c| c.name.as_str()).collect();
        println!(
            "{:<24} {:>6} votes  {}",
            s.leaderboard.slug,
            s.vote_count,
            s.leaderboard.question,
        );
        if !preview.is_empty() {
            println!("{:<24} {}", "", preview.join(", "));
        }
    }
}

pub fn print_summaries_json(summaries: &[LeaderboardSummary]) {
    let items: Vec<JsonSummary> = summaries
        .iter()
        .map(|s| JsonSummary {
            leaderboard: &s.leaderboard,
            votes: s.vote_count,
            preview: &s.preview,
        })
        .collect();
    print_json(&items);
}
