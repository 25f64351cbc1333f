use ids_inspector::config::ValidatorConfig;
use ids_inspector::model::{Facet, IdsDocument, Specification, Status, Value};
use ids_inspector::validation::{IdsSource, IfcSource, Orchestrator, Strategy, ValidationEvent};
use pretty_assertions::assert_eq;
use std::sync::Mutex;

fn wall_ids() -> IdsSource {
    let mut spec = Specification::new("Named walls", "IFC4");
    spec.applicability.push(Facet::entity(Value::simple("IFCWALL")));
    spec.requirements.push(Facet::attribute(Value::simple("Name"), None));
    IdsSource::new(
        "walls.ids",
        IdsDocument {
            specifications: vec![spec],
            ..IdsDocument::default()
        },
    )
}

fn small_model(index: usize) -> IfcSource {
    IfcSource::new(
        format!("model-{index:02}.ifc"),
        format!("#1=IFCWALL('W{index}',$,'Wall {index}',$,$,$,$,$,$);\n#2=IFCSLAB('S{index}',$,'Slab',$,$,$,$,$,$);\n"),
    )
}

#[test]
fn ten_small_files_run_in_parallel_and_keep_order() {
    let files: Vec<IfcSource> = (0..10).map(small_model).collect();
    let mut orchestrator = Orchestrator::new(ValidatorConfig::default());
    assert_eq!(orchestrator.choose_strategy(&files), Strategy::ParallelSmallFiles);

    let started = Mutex::new(None);
    let report = orchestrator.validate(&files, &[wall_ids()], |event| {
        if let ValidationEvent::Started { strategy, .. } = event {
            *started.lock().unwrap() = Some(*strategy);
        }
    });

    assert_eq!(started.into_inner().unwrap(), Some(Strategy::ParallelSmallFiles));
    assert!(!report.aborted);
    assert_eq!(report.ids_results.len(), 1);

    let names: Vec<&str> = report.ids_results[0]
        .ifc_results
        .iter()
        .map(|r| r.file_name.as_str())
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("model-{i:02}.ifc")).collect();
    assert_eq!(names, expected);

    for result in &report.ids_results[0].ifc_results {
        assert_eq!(result.entity_count, 2);
        assert_eq!(result.specification_results[0].status, Status::Pass);
    }
    assert_eq!(report.summary().total, 10);
}

#[test]
fn large_file_forces_sequential_processing() {
    let files: Vec<IfcSource> = (0..3).map(small_model).collect();
    let mut orchestrator = Orchestrator::new(ValidatorConfig {
        large_file_threshold_bytes: 10,
        ..ValidatorConfig::default()
    });
    assert_eq!(orchestrator.choose_strategy(&files), Strategy::SequentialLarge);

    let report = orchestrator.validate(&files, &[wall_ids()], |_| {});
    assert_eq!(report.ids_results[0].ifc_results.len(), 3);
    assert_eq!(report.summary().passed, 3);
}

#[test]
fn every_ids_gets_every_file() {
    let files: Vec<IfcSource> = (0..2).map(small_model).collect();
    let mut other = wall_ids();
    other.name = "other.ids".into();

    let report = Orchestrator::default().validate(&files, &[wall_ids(), other], |_| {});
    let ids_names: Vec<&str> = report.ids_results.iter().map(|r| r.ids_name.as_str()).collect();
    assert_eq!(ids_names, ["walls.ids", "other.ids"]);
    assert!(report.ids_results.iter().all(|r| r.ifc_results.len() == 2));
}
