#![no_main]

use libfuzzer_sys::fuzz_target;
use rostrum::config::TournamentConfig;
use rostrum::engine::{BracketProjection, QualificationResolver, ScoreAggregator, WinnerResolver};
use rostrum::store::Snapshot;

const CONFIG: &str = r"
tournament: { name: Fuzz }
phases:
  Grupos: {}
  Cuartos:
    kind: knockout
    qualification: { policy: seeds_from_phase, phase: Grupos, seeds: [1, 4, 2, 3] }
  Final:
    kind: knockout
    qualification: { policy: winners_of, rounds: [Cuartos 1, Cuartos 2] }
";

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = serde_json::from_slice::<Snapshot>(data) else {
        return;
    };
    let Ok(config) = serde_yaml::from_str::<TournamentConfig>(CONFIG) else {
        return;
    };

    let submissions = snapshot.submissions();
    let aggregator = ScoreAggregator::new(&submissions);
    let resolver = QualificationResolver::new(
        &config,
        &snapshot.rounds,
        &submissions,
        &snapshot.schools,
        &snapshot.draw_state,
    );
    for round in &snapshot.rounds {
        let _ = WinnerResolver::resolve(&aggregator.round(&round.name).totals);
        let _ = resolver.resolve(&round.name);
    }
    let _ = BracketProjection::new(&config, &snapshot).project();
});
