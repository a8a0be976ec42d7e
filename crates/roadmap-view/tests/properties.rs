use proptest::prelude::*;
use roadmap_core::{format_date, Product, RecordField, RoadmapDate, RoadmapRecord, Status};
use roadmap_view::{FilterStage, SortOrder, SortStage, ViewAction, ViewModelPipeline, ViewState};

fn scenario_records() -> Vec<RoadmapRecord> {
    let mut a = RoadmapRecord::new("A", Status::ToDo, Product::Pull);
    a.due_date = Some("January 2024".into());
    let mut b = RoadmapRecord::new("B", Status::Completed, Product::Push);
    b.due_date = Some("March 2023".into());
    vec![a, b]
}

fn shown(records: &[RoadmapRecord], state: &ViewState) -> Vec<String> {
    ViewModelPipeline::default()
        .run(records, state)
        .rows
        .into_iter()
        .map(|row| row.summary)
        .collect()
}

#[test]
fn due_date_ascending_puts_older_first() {
    let records = scenario_records();
    assert_eq!(shown(&records, &ViewState::default()), vec!["B", "A"]);
}

#[test]
fn search_matches_on_any_text_field() {
    // "A" matches on its summary, "B" only through its due date text
    let records = scenario_records();
    let state = ViewState::unsorted().apply(ViewAction::SetSearch("a".into()));
    assert_eq!(shown(&records, &state), vec!["A", "B"]);
}

#[test]
fn status_filter_keeps_only_completed() {
    let records = scenario_records();
    let state = ViewState::unsorted().apply(ViewAction::SetStatusFilter("Completed".into()));
    assert_eq!(shown(&records, &state), vec!["B"]);
}

fn status_key(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::ToDo),
        Just(Status::Planned),
        Just(Status::InProgress),
        Just(Status::InCertification),
        Just(Status::Completed),
        "[a-z ]{0,8}".prop_map(Status::Unknown),
    ]
}

fn arb_date() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        (2019i32..2027, 1u32..13).prop_map(|(y, m)| Some(format!("{y}-{m:02}-01"))),
        (0usize..12, 2019i32..2027).prop_map(|(m, y)| {
            const MONTHS: [&str; 12] = [
                "January", "February", "March", "April", "May", "June", "July", "August",
                "September", "October", "November", "December",
            ];
            Some(format!("{} {y}", MONTHS[m]))
        }),
        "[A-Za-z0-9 ]{0,10}".prop_map(Some),
    ]
}

prop_compose! {
    fn arb_record()(
        summary in "[A-Za-z]{1,10}",
        status in arb_status(),
        due in arb_date(),
        description in "[a-z ]{0,20}",
        pct in proptest::option::of(-20.0f64..150.0),
    ) -> RoadmapRecord {
        let mut record = RoadmapRecord::new(summary, status, Product::Pull);
        record.due_date = due;
        record.external_description = description;
        record.percentage_total = pct;
        record
    }
}

fn arb_records() -> impl Strategy<Value = Vec<RoadmapRecord>> {
    proptest::collection::vec(arb_record(), 0..24)
}

fn arb_field() -> impl Strategy<Value = RecordField> {
    prop_oneof![
        Just(RecordField::DueDate),
        Just(RecordField::Summary),
        Just(RecordField::Status),
        Just(RecordField::PercentageTotal),
        Just(RecordField::ExternalDescription),
    ]
}

proptest! {
    #[test]
    fn empty_filter_is_identity(records in arb_records()) {
        let out = FilterStage::new("", "", "").apply(&records);
        prop_assert_eq!(out.len(), records.len());
        for (kept, original) in out.iter().zip(records.iter()) {
            prop_assert!(std::ptr::eq(*kept, original));
        }
    }

    #[test]
    fn filter_output_is_an_ordered_subset(records in arb_records(), term in "[a-z]{0,3}") {
        let out = FilterStage::new(&term, "", "").apply(&records);
        let mut cursor = records.iter();
        for kept in out {
            prop_assert!(cursor.any(|r| std::ptr::eq(r, kept)));
        }
    }

    #[test]
    fn status_filter_only_keeps_equal_statuses(records in arb_records(), wanted in arb_status()) {
        let filter = wanted.label().to_string();
        let out = FilterStage::new("", &filter, "").apply(&records);
        if filter.trim().is_empty() {
            prop_assert_eq!(out.len(), records.len());
        } else {
            let key = status_key(&filter);
            for kept in &out {
                prop_assert_eq!(status_key(kept.status.label()), key.clone());
            }
            let expected = records
                .iter()
                .filter(|r| !key.is_empty() && status_key(r.status.label()) == key)
                .count();
            prop_assert_eq!(out.len(), expected);
        }
    }

    #[test]
    fn sort_is_a_permutation_and_idempotent(records in arb_records(), field in arb_field()) {
        let stage = SortStage::new(Some(field), Some(SortOrder::Asc));
        let once = stage.apply(records.iter().collect());
        let twice = stage.apply(once.clone());
        prop_assert_eq!(once.len(), records.len());
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn descending_reverses_ascending_for_distinct_dates(
        years in proptest::collection::btree_set(1990i32..2090, 0..16)
    ) {
        let records: Vec<_> = years
            .iter()
            .map(|y| {
                let mut r = RoadmapRecord::new(format!("r{y}"), Status::ToDo, Product::Push);
                r.due_date = Some(format!("{y}-06-01"));
                r
            })
            .collect();
        let asc = SortStage::new(Some(RecordField::DueDate), Some(SortOrder::Asc)).apply(records.iter().collect());
        let mut desc = SortStage::new(Some(RecordField::DueDate), Some(SortOrder::Desc)).apply(records.iter().collect());
        desc.reverse();
        prop_assert_eq!(asc, desc);
    }

    #[test]
    fn unsortable_values_stay_at_the_end(records in arb_records(), descending in any::<bool>()) {
        let order = if descending { SortOrder::Desc } else { SortOrder::Asc };
        let sorted = SortStage::new(Some(RecordField::DueDate), Some(order)).apply(records.iter().collect());
        let first_missing = sorted
            .iter()
            .position(|r| r.date(RecordField::DueDate).is_none())
            .unwrap_or(sorted.len());
        prop_assert!(sorted[first_missing..].iter().all(|r| r.date(RecordField::DueDate).is_none()));
    }

    #[test]
    fn format_date_is_total(raw in proptest::option::of(".{0,24}")) {
        let shown = format_date(raw.as_deref());
        prop_assert_eq!(shown.is_empty(), raw.as_deref().and_then(RoadmapDate::parse).is_none());
    }

    #[test]
    fn month_year_dates_render_abbreviated(month in 1u32..13, year in 1000i32..10000) {
        let shown = format_date(Some(&format!("{year}-{month:02}-15")));
        prop_assert_eq!(shown.len(), 8);
        prop_assert!(shown.ends_with(&year.to_string()));
    }

    #[test]
    fn progress_width_is_clamped(records in arb_records()) {
        let view = ViewModelPipeline::default().run(&records, &ViewState::unsorted());
        for row in view.rows {
            if let Some(progress) = row.progress {
                prop_assert!((0.0..=100.0).contains(&progress.width));
            }
        }
    }
}
