use liftplan_lib::model::TempIds;
use liftplan_lib::{
    compute_insertion, resolve_drop, Bounds, DayOfWeek, DragController, DragItem, DragState,
    DragThresholds, EntityId, Exercise, ExerciseCoord, ExerciseParams, HoverTarget,
    IndicatorCalculator, InsertionPoint, LibraryExercise, MutationLayer, NewExercise,
    PermissionLevel, Plan, PlanCommand, Point, PointerKind, RegionMap, SettleOutcome, Severity,
    StableKey, Week,
};
use std::time::{Duration, Instant};

fn thresholds() -> DragThresholds {
    DragThresholds {
        activation_distance: 2.0,
        touch_hold: Duration::from_millis(250),
    }
}

fn exercise(id: i64, name: &str) -> Exercise {
    Exercise {
        id: EntityId::Db(id),
        base_id: id,
        name: name.to_string(),
        order: 0, // Renumbered on insert
        params: ExerciseParams::default(),
        sets: Vec::new(),
    }
}

fn library(id: i64, name: &str) -> LibraryExercise {
    LibraryExercise {
        id,
        name: name.to_string(),
        equipment: None,
        muscle_groups: Vec::new(),
    }
}

/// Two empty weeks; callers add exercises where the scenario needs them.
fn empty_plan() -> Plan {
    let mut ids = TempIds::default();
    Plan {
        id: 1,
        title: "Test".to_string(),
        is_draft: false,
        completed_at: None,
        weeks: vec![
            Week::empty(EntityId::Db(10), 1, &mut ids),
            Week::empty(EntityId::Db(11), 2, &mut ids),
        ],
    }
}

fn plan_with_monday(names: &[&str]) -> Plan {
    let mut plan = empty_plan();
    for (i, name) in names.iter().enumerate() {
        plan = plan
            .add_exercise(0, DayOfWeek::Monday, exercise(i as i64 + 1, name), i)
            .unwrap();
    }
    plan
}

/// One day container with two exercise rows stacked inside it.
fn monday_regions() -> RegionMap {
    let mut regions = RegionMap::default();
    regions.push_day(0, DayOfWeek::Monday, Bounds::new(0.0, 0.0, 20.0, 10.0));
    regions.push_exercise(
        ExerciseCoord::new(0, DayOfWeek::Monday, 0),
        Bounds::new(0.0, 1.0, 20.0, 1.0),
    );
    regions.push_exercise(
        ExerciseCoord::new(0, DayOfWeek::Monday, 1),
        Bounds::new(0.0, 2.0, 20.0, 1.0),
    );
    regions
}

// --- Drag state machine ---

#[test]
fn test_mouse_press_below_distance_stays_pending() {
    let mut drag = DragController::new(thresholds());
    let t0 = Instant::now();
    let regions = monday_regions();

    drag.pointer_down(
        DragItem::Library(library(1, "Bench Press")),
        PointerKind::Mouse,
        Point::new(5.0, 5.0),
        t0,
    );
    assert!(matches!(drag.state(), DragState::Pending { .. }));

    // One cell of travel is under the 2.0 gate
    let changed = drag.pointer_move(Point::new(5.0, 6.0), t0, &regions);
    assert!(!changed);
    assert!(!drag.is_dragging());

    let changed = drag.pointer_move(Point::new(5.0, 8.0), t0, &regions);
    assert!(changed);
    assert!(drag.is_dragging());
}

#[test]
fn test_touch_press_activates_on_hold_not_distance() {
    let mut drag = DragController::new(thresholds());
    let t0 = Instant::now();
    let regions = monday_regions();

    drag.pointer_down(
        DragItem::Library(library(1, "Bench Press")),
        PointerKind::Touch,
        Point::new(5.0, 5.0),
        t0,
    );

    // Large travel before the hold elapses reads as a scroll, not a drag
    assert!(!drag.pointer_move(Point::new(5.0, 30.0), t0 + Duration::from_millis(50), &regions));
    assert!(!drag.is_dragging());

    assert!(drag.pointer_move(Point::new(5.0, 30.0), t0 + Duration::from_millis(300), &regions));
    assert!(drag.is_dragging());
}

#[test]
fn test_release_while_pending_is_a_tap() {
    let mut drag = DragController::new(thresholds());
    let regions = monday_regions();
    drag.pointer_down(
        DragItem::Library(library(1, "Bench Press")),
        PointerKind::Mouse,
        Point::new(5.0, 5.0),
        Instant::now(),
    );
    assert!(drag.pointer_up(Point::new(5.0, 5.5), &regions).is_none());
    assert!(matches!(drag.state(), DragState::Idle));
}

#[test]
fn test_drop_reports_hover_at_release_point() {
    let mut drag = DragController::new(thresholds());
    let t0 = Instant::now();
    let regions = monday_regions();

    drag.pointer_down(
        DragItem::Library(library(1, "Bench Press")),
        PointerKind::Mouse,
        Point::new(30.0, 30.0),
        t0,
    );
    drag.pointer_move(Point::new(10.0, 2.5), t0, &regions);
    assert_eq!(
        drag.hover(),
        Some(HoverTarget::Exercise(ExerciseCoord::new(0, DayOfWeek::Monday, 1)))
    );

    let drop = drag.pointer_up(Point::new(10.0, 5.0), &regions).unwrap();
    // Release below the rows but inside the day container
    assert_eq!(
        drop.hover,
        Some(HoverTarget::Day {
            week_index: 0,
            day_of_week: DayOfWeek::Monday
        })
    );
    assert!(matches!(drag.state(), DragState::Idle));
}

#[test]
fn test_cancel_discards_session() {
    let mut drag = DragController::new(thresholds());
    let t0 = Instant::now();
    let regions = monday_regions();
    drag.pointer_down(
        DragItem::Library(library(1, "Bench Press")),
        PointerKind::Mouse,
        Point::new(0.0, 0.0),
        t0,
    );
    drag.pointer_move(Point::new(10.0, 2.5), t0, &regions);
    assert!(drag.is_dragging());

    drag.cancel();
    assert!(matches!(drag.state(), DragState::Idle));
    assert!(drag.pointer_up(Point::new(10.0, 2.5), &regions).is_none());
}

#[test]
fn test_second_press_during_session_is_ignored() {
    let mut drag = DragController::new(thresholds());
    let t0 = Instant::now();
    drag.pointer_down(
        DragItem::Library(library(1, "Bench Press")),
        PointerKind::Mouse,
        Point::new(0.0, 0.0),
        t0,
    );
    drag.pointer_down(
        DragItem::Library(library(2, "Back Squat")),
        PointerKind::Mouse,
        Point::new(9.0, 9.0),
        t0,
    );
    match drag.state() {
        DragState::Pending { item, .. } => {
            assert_eq!(*item, DragItem::Library(library(1, "Bench Press")));
        }
        other => panic!("unexpected state {other:?}"),
    }
}

// --- Hit-testing ---

#[test]
fn test_hit_test_exercise_wins_over_day() {
    let regions = monday_regions();
    assert_eq!(
        regions.hit_test(Point::new(5.0, 1.5)),
        Some(HoverTarget::Exercise(ExerciseCoord::new(0, DayOfWeek::Monday, 0)))
    );
    assert_eq!(
        regions.hit_test(Point::new(5.0, 7.0)),
        Some(HoverTarget::Day {
            week_index: 0,
            day_of_week: DayOfWeek::Monday
        })
    );
    assert_eq!(regions.hit_test(Point::new(25.0, 5.0)), None);
    // Bounds are half-open: the far edge is outside
    assert_eq!(regions.hit_test(Point::new(20.0, 5.0)), None);
}

// --- Insertion index ---

#[test]
fn test_insertion_over_exercise_inserts_before() {
    let plan = plan_with_monday(&["A", "B", "C"]);
    let item = DragItem::Library(library(9, "New"));
    let hover = HoverTarget::Exercise(ExerciseCoord::new(0, DayOfWeek::Monday, 1));
    assert_eq!(
        compute_insertion(&plan, &item, &hover),
        Some(InsertionPoint {
            week_index: 0,
            day_of_week: DayOfWeek::Monday,
            index: 1
        })
    );
}

#[test]
fn test_insertion_over_day_appends() {
    let plan = plan_with_monday(&["A", "B"]);
    let item = DragItem::Library(library(9, "New"));
    let hover = HoverTarget::Day {
        week_index: 0,
        day_of_week: DayOfWeek::Monday,
    };
    assert_eq!(compute_insertion(&plan, &item, &hover).unwrap().index, 2);

    // Empty day appends at zero
    let hover = HoverTarget::Day {
        week_index: 0,
        day_of_week: DayOfWeek::Tuesday,
    };
    assert_eq!(compute_insertion(&plan, &item, &hover).unwrap().index, 0);
}

#[test]
fn test_insertion_suppressed_for_same_day_and_rest_day() {
    let mut plan = plan_with_monday(&["A", "B"]);
    let origin = DragItem::InPlan(ExerciseCoord::new(0, DayOfWeek::Monday, 0));
    let hover = HoverTarget::Exercise(ExerciseCoord::new(0, DayOfWeek::Monday, 1));
    assert_eq!(compute_insertion(&plan, &origin, &hover), None);

    // Rest day never shows an indicator
    plan = plan
        .update_day(
            0,
            DayOfWeek::Friday,
            &liftplan_lib::DayPatch {
                is_rest_day: Some(true),
                tag: None,
            },
        )
        .unwrap();
    let hover = HoverTarget::Day {
        week_index: 0,
        day_of_week: DayOfWeek::Friday,
    };
    assert_eq!(
        compute_insertion(&plan, &DragItem::Library(library(9, "New")), &hover),
        None
    );
}

#[test]
fn test_insertion_stale_hover_is_none() {
    let plan = plan_with_monday(&["A"]);
    let hover = HoverTarget::Day {
        week_index: 5,
        day_of_week: DayOfWeek::Monday,
    };
    assert_eq!(
        compute_insertion(&plan, &DragItem::Library(library(9, "New")), &hover),
        None
    );
}

// --- Indicator throttling ---

#[test]
fn test_indicator_throttles_and_flushes_on_tick() {
    let plan = plan_with_monday(&["A", "B"]);
    let regions = monday_regions();
    let mut drag = DragController::new(thresholds());
    let mut calc = IndicatorCalculator::new(Duration::from_millis(16));
    let t0 = Instant::now();

    drag.pointer_down(
        DragItem::Library(library(9, "New")),
        PointerKind::Mouse,
        Point::new(30.0, 30.0),
        t0,
    );
    drag.pointer_move(Point::new(5.0, 1.5), t0, &regions);
    calc.on_pointer(&plan, &drag, t0);
    assert_eq!(calc.current().map(|p| p.index), Some(0));

    // Inside the window: the new hover is noted but not recomputed yet
    drag.pointer_move(Point::new(5.0, 2.5), t0 + Duration::from_millis(5), &regions);
    calc.on_pointer(&plan, &drag, t0 + Duration::from_millis(5));
    assert_eq!(calc.current().map(|p| p.index), Some(0));

    // Ticking inside the window still holds
    calc.tick(&plan, &drag, t0 + Duration::from_millis(10));
    assert_eq!(calc.current().map(|p| p.index), Some(0));

    // Once the window elapses the pending recompute flushes
    calc.tick(&plan, &drag, t0 + Duration::from_millis(20));
    assert_eq!(calc.current().map(|p| p.index), Some(1));
}

#[test]
fn test_indicator_cancel_clears_pending_work() {
    let plan = plan_with_monday(&["A"]);
    let regions = monday_regions();
    let mut drag = DragController::new(thresholds());
    let mut calc = IndicatorCalculator::new(Duration::from_millis(16));
    let t0 = Instant::now();

    drag.pointer_down(
        DragItem::Library(library(9, "New")),
        PointerKind::Mouse,
        Point::new(30.0, 30.0),
        t0,
    );
    drag.pointer_move(Point::new(5.0, 1.5), t0, &regions);
    calc.on_pointer(&plan, &drag, t0);
    calc.on_pointer(&plan, &drag, t0 + Duration::from_millis(5)); // Pending

    calc.cancel();
    assert_eq!(calc.current(), None);

    // A late tick must not resurrect the indicator
    calc.tick(&plan, &drag, t0 + Duration::from_millis(40));
    assert_eq!(calc.current(), None);
}

// --- Drop resolution ---

#[test]
fn test_resolve_drop_library_over_exercise() {
    let plan = plan_with_monday(&["A", "B"]);
    let item = DragItem::Library(library(9, "New"));
    let hover = HoverTarget::Exercise(ExerciseCoord::new(0, DayOfWeek::Monday, 1));
    let insertion = compute_insertion(&plan, &item, &hover);

    let command = resolve_drop(&plan, &item, Some(&hover), insertion).unwrap();
    match command {
        PlanCommand::AddExercise {
            week_index,
            day_of_week,
            exercise,
            position,
        } => {
            assert_eq!((week_index, day_of_week), (0, DayOfWeek::Monday));
            assert_eq!(exercise.base_id, 9);
            assert_eq!(position, 2); // 0-based index 1 → order slot 2
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_resolve_drop_same_index_reorder_is_none() {
    let plan = plan_with_monday(&["A", "B"]);
    let item = DragItem::InPlan(ExerciseCoord::new(0, DayOfWeek::Monday, 1));
    let hover = HoverTarget::Exercise(ExerciseCoord::new(0, DayOfWeek::Monday, 1));
    assert_eq!(resolve_drop(&plan, &item, Some(&hover), None), None);
}

#[test]
fn test_resolve_drop_same_day_reorder() {
    let plan = plan_with_monday(&["A", "B", "C"]);
    let item = DragItem::InPlan(ExerciseCoord::new(0, DayOfWeek::Monday, 0));
    let hover = HoverTarget::Exercise(ExerciseCoord::new(0, DayOfWeek::Monday, 2));
    assert_eq!(
        resolve_drop(&plan, &item, Some(&hover), None),
        Some(PlanCommand::ReorderWithinDay {
            week_index: 0,
            day_of_week: DayOfWeek::Monday,
            from: 0,
            to: 2,
        })
    );

    // Dropping on the day container sends it to the end
    let hover = HoverTarget::Day {
        week_index: 0,
        day_of_week: DayOfWeek::Monday,
    };
    assert_eq!(
        resolve_drop(&plan, &item, Some(&hover), None),
        Some(PlanCommand::ReorderWithinDay {
            week_index: 0,
            day_of_week: DayOfWeek::Monday,
            from: 0,
            to: 2,
        })
    );
}

#[test]
fn test_resolve_drop_cross_day_move_uses_insertion_index() {
    let mut plan = plan_with_monday(&["A", "B"]);
    plan = plan
        .add_exercise(0, DayOfWeek::Tuesday, exercise(7, "T"), 0)
        .unwrap();
    let item = DragItem::InPlan(ExerciseCoord::new(0, DayOfWeek::Monday, 1));
    let hover = HoverTarget::Exercise(ExerciseCoord::new(0, DayOfWeek::Tuesday, 0));
    let insertion = compute_insertion(&plan, &item, &hover);

    assert_eq!(
        resolve_drop(&plan, &item, Some(&hover), insertion),
        Some(PlanCommand::MoveExercise {
            from: ExerciseCoord::new(0, DayOfWeek::Monday, 1),
            to: ExerciseCoord::new(0, DayOfWeek::Tuesday, 0),
        })
    );
}

#[test]
fn test_resolve_drop_ignores_insertion_point_from_another_day() {
    let mut plan = plan_with_monday(&["A", "B", "C"]);
    plan = plan
        .add_exercise(0, DayOfWeek::Tuesday, exercise(7, "T"), 0)
        .unwrap();
    let hover = HoverTarget::Exercise(ExerciseCoord::new(0, DayOfWeek::Tuesday, 0));
    // The throttle can leave a point computed just before the pointer
    // crossed from Monday into Tuesday; its index must not be reused.
    let stale = Some(InsertionPoint {
        week_index: 0,
        day_of_week: DayOfWeek::Monday,
        index: 2,
    });

    let item = DragItem::Library(library(9, "New"));
    let command = resolve_drop(&plan, &item, Some(&hover), stale).unwrap();
    match command {
        PlanCommand::AddExercise {
            day_of_week,
            position,
            ..
        } => {
            assert_eq!(day_of_week, DayOfWeek::Tuesday);
            assert_eq!(position, 1); // insert-before the hovered row
        }
        other => panic!("unexpected command {other:?}"),
    }

    let item = DragItem::InPlan(ExerciseCoord::new(0, DayOfWeek::Monday, 1));
    assert_eq!(
        resolve_drop(&plan, &item, Some(&hover), stale),
        Some(PlanCommand::MoveExercise {
            from: ExerciseCoord::new(0, DayOfWeek::Monday, 1),
            to: ExerciseCoord::new(0, DayOfWeek::Tuesday, 0),
        })
    );
}

#[test]
fn test_resolve_drop_outside_and_rest_day_are_none() {
    let mut plan = plan_with_monday(&["A"]);
    let item = DragItem::Library(library(9, "New"));
    assert_eq!(resolve_drop(&plan, &item, None, None), None);

    plan = plan
        .update_day(
            0,
            DayOfWeek::Sunday,
            &liftplan_lib::DayPatch {
                is_rest_day: Some(true),
                tag: None,
            },
        )
        .unwrap();
    let hover = HoverTarget::Day {
        week_index: 0,
        day_of_week: DayOfWeek::Sunday,
    };
    assert_eq!(resolve_drop(&plan, &item, Some(&hover), None), None);
}

// --- Optimistic mutation layer ---

fn new_exercise(base_id: i64, name: &str) -> NewExercise {
    NewExercise::from_library(&library(base_id, name))
}

#[test]
fn test_apply_is_optimistic_and_success_assigns_ids() {
    let mut layer = MutationLayer::new(Duration::from_millis(400));
    let plan = empty_plan();

    let applied = layer
        .apply(
            &plan,
            PermissionLevel::Editor,
            PlanCommand::AddExercise {
                week_index: 0,
                day_of_week: DayOfWeek::Monday,
                exercise: new_exercise(9, "Bench Press"),
                position: 1,
            },
        )
        .unwrap();
    let mut plan = applied.plan;
    // One exercise plus its three default sets were minted
    assert_eq!(applied.created.len(), 4);
    assert!(plan.exercise(0, DayOfWeek::Monday, 0).unwrap().is_pending());
    assert_eq!(layer.pending_count(), 1);

    let assigned: Vec<(u64, i64)> = applied
        .created
        .iter()
        .copied()
        .zip([100, 101, 102, 103])
        .collect();
    let notice = layer.settle(
        &mut plan,
        applied.id,
        &SettleOutcome::Success { assigned },
        Instant::now(),
    );
    assert!(notice.is_none());
    assert_eq!(layer.pending_count(), 0);

    let exercise = plan.exercise(0, DayOfWeek::Monday, 0).unwrap();
    assert_eq!(exercise.id, EntityId::Db(100));
    let set_ids: Vec<_> = exercise.sets.iter().map(|s| s.id).collect();
    assert_eq!(
        set_ids,
        vec![EntityId::Db(101), EntityId::Db(102), EntityId::Db(103)]
    );
}

#[test]
fn test_failure_rolls_back_only_its_own_scope() {
    let mut layer = MutationLayer::new(Duration::from_millis(400));
    let plan = empty_plan();

    let a = layer
        .apply(
            &plan,
            PermissionLevel::Editor,
            PlanCommand::AddExercise {
                week_index: 0,
                day_of_week: DayOfWeek::Monday,
                exercise: new_exercise(1, "Bench Press"),
                position: 1,
            },
        )
        .unwrap();
    let b = layer
        .apply(
            &a.plan,
            PermissionLevel::Editor,
            PlanCommand::AddExercise {
                week_index: 0,
                day_of_week: DayOfWeek::Tuesday,
                exercise: new_exercise(2, "Back Squat"),
                position: 1,
            },
        )
        .unwrap();
    let mut plan = b.plan;

    let notice = layer.settle(
        &mut plan,
        a.id,
        &SettleOutcome::Failure {
            message: "server said no".to_string(),
        },
        Instant::now(),
    );
    let notice = notice.expect("failure must produce a notice");
    assert_eq!(notice.severity, Severity::Error);
    assert!(notice.message.contains("server said no"));

    // Monday was restored; Tuesday's unsettled change survived
    assert!(plan.day(0, DayOfWeek::Monday).unwrap().exercises.is_empty());
    assert_eq!(plan.day(0, DayOfWeek::Tuesday).unwrap().exercises.len(), 1);
    assert_eq!(layer.pending_count(), 1);
}

#[test]
fn test_reorder_failure_restores_original_order() {
    let mut layer = MutationLayer::new(Duration::from_millis(400));
    let plan = plan_with_monday(&["A", "B"]);

    let applied = layer
        .apply(
            &plan,
            PermissionLevel::Editor,
            PlanCommand::ReorderWithinDay {
                week_index: 0,
                day_of_week: DayOfWeek::Monday,
                from: 0,
                to: 1,
            },
        )
        .unwrap();
    let mut plan = applied.plan;
    let names = |plan: &Plan| -> Vec<String> {
        plan.day(0, DayOfWeek::Monday)
            .unwrap()
            .exercises
            .iter()
            .map(|e| e.name.clone())
            .collect()
    };
    assert_eq!(names(&plan), ["B", "A"]);

    let notice = layer.settle(
        &mut plan,
        applied.id,
        &SettleOutcome::Failure {
            message: "conflict".to_string(),
        },
        Instant::now(),
    );
    assert_eq!(notice.unwrap().severity, Severity::Error);

    // Back to exactly the pre-drag state, orders dense again
    assert_eq!(names(&plan), ["A", "B"]);
    let day = plan.day(0, DayOfWeek::Monday).unwrap();
    assert_eq!(
        day.exercises.iter().map(|e| e.order).collect::<Vec<_>>(),
        [1, 2]
    );
}

#[test]
fn test_out_of_order_settlement() {
    let mut layer = MutationLayer::new(Duration::from_millis(400));
    let plan = empty_plan();

    let a = layer
        .apply(
            &plan,
            PermissionLevel::Editor,
            PlanCommand::AddExercise {
                week_index: 0,
                day_of_week: DayOfWeek::Monday,
                exercise: new_exercise(1, "Bench Press"),
                position: 1,
            },
        )
        .unwrap();
    let b = layer
        .apply(
            &a.plan,
            PermissionLevel::Editor,
            PlanCommand::AddExercise {
                week_index: 0,
                day_of_week: DayOfWeek::Monday,
                exercise: new_exercise(2, "Back Squat"),
                position: 2,
            },
        )
        .unwrap();
    let mut plan = b.plan;

    // B's confirmation arrives before A's
    let assigned_b: Vec<_> = b.created.iter().copied().zip([200, 201, 202, 203]).collect();
    assert!(layer
        .settle(&mut plan, b.id, &SettleOutcome::Success { assigned: assigned_b }, Instant::now())
        .is_none());
    let assigned_a: Vec<_> = a.created.iter().copied().zip([100, 101, 102, 103]).collect();
    assert!(layer
        .settle(&mut plan, a.id, &SettleOutcome::Success { assigned: assigned_a }, Instant::now())
        .is_none());

    let day = plan.day(0, DayOfWeek::Monday).unwrap();
    assert_eq!(day.exercises[0].id, EntityId::Db(100));
    assert_eq!(day.exercises[1].id, EntityId::Db(200));
    assert_eq!(layer.pending_count(), 0);
}

#[test]
fn test_update_day_failure_restores_day_fields() {
    let mut layer = MutationLayer::new(Duration::from_millis(400));
    let plan = plan_with_monday(&["A"]);

    let applied = layer
        .apply(
            &plan,
            PermissionLevel::Editor,
            PlanCommand::UpdateDay {
                week_index: 0,
                day_of_week: DayOfWeek::Monday,
                patch: liftplan_lib::DayPatch {
                    is_rest_day: Some(true),
                    tag: None,
                },
            },
        )
        .unwrap();
    let mut plan = applied.plan;
    assert!(plan.day(0, DayOfWeek::Monday).unwrap().is_rest_day);
    assert!(plan.day(0, DayOfWeek::Monday).unwrap().exercises.is_empty());

    let notice = layer.settle(
        &mut plan,
        applied.id,
        &SettleOutcome::Failure {
            message: "offline".to_string(),
        },
        Instant::now(),
    );
    assert_eq!(notice.unwrap().severity, Severity::Error);

    // The whole day snapshot comes back: flag and cleared exercises
    let day = plan.day(0, DayOfWeek::Monday).unwrap();
    assert!(!day.is_rest_day);
    assert_eq!(day.exercises.len(), 1);
}

#[test]
fn test_settle_unknown_id_is_noop() {
    let mut layer = MutationLayer::new(Duration::from_millis(400));
    let mut plan = empty_plan();
    let before = plan.clone();
    let notice = layer.settle(
        &mut plan,
        42,
        &SettleOutcome::Failure {
            message: "late duplicate".to_string(),
        },
        Instant::now(),
    );
    assert!(notice.is_none());
    assert_eq!(plan, before);
}

#[test]
fn test_refetch_gate_honours_pending_and_debounce() {
    let mut layer = MutationLayer::new(Duration::from_millis(400));
    let plan = empty_plan();
    let t0 = Instant::now();
    assert!(layer.refetch_allowed(t0));

    let applied = layer
        .apply(
            &plan,
            PermissionLevel::Editor,
            PlanCommand::AddWeek,
        )
        .unwrap();
    let mut plan = applied.plan;
    assert!(!layer.refetch_allowed(t0 + Duration::from_secs(60)));

    let assigned: Vec<_> = applied
        .created
        .iter()
        .copied()
        .zip(300..300 + applied.created.len() as i64)
        .collect();
    layer.settle(
        &mut plan,
        applied.id,
        &SettleOutcome::Success { assigned },
        t0,
    );
    // Quiet window after the settle
    assert!(!layer.refetch_allowed(t0 + Duration::from_millis(100)));
    assert!(layer.refetch_allowed(t0 + Duration::from_millis(400)));
}

#[test]
fn test_set_commands_locked_while_parent_pending() {
    let mut layer = MutationLayer::new(Duration::from_millis(400));
    let plan = empty_plan();
    let applied = layer
        .apply(
            &plan,
            PermissionLevel::Editor,
            PlanCommand::AddExercise {
                week_index: 0,
                day_of_week: DayOfWeek::Monday,
                exercise: new_exercise(1, "Bench Press"),
                position: 1,
            },
        )
        .unwrap();

    let result = layer.apply(
        &applied.plan,
        PermissionLevel::Editor,
        PlanCommand::AddSet {
            coord: ExerciseCoord::new(0, DayOfWeek::Monday, 0),
            reps: liftplan_lib::RepRange::new(5, 5),
            weight: None,
            rpe: None,
        },
    );
    assert!(matches!(
        result,
        Err(liftplan_lib::CommandError::PendingParent)
    ));
}

#[test]
fn test_viewer_apply_refused() {
    let mut layer = MutationLayer::new(Duration::from_millis(400));
    let plan = empty_plan();
    let result = layer.apply(&plan, PermissionLevel::Viewer, PlanCommand::AddWeek);
    assert!(matches!(
        result,
        Err(liftplan_lib::CommandError::Gate(_))
    ));
    assert_eq!(layer.pending_count(), 0);
}

// --- Stable keys ---

#[test]
fn test_stable_keys_follow_coordinates() {
    let mut plan = empty_plan();
    for (i, name) in ["A", "B"].iter().enumerate() {
        plan = plan
            .add_exercise(0, DayOfWeek::Wednesday, exercise(i as i64 + 1, name), i)
            .unwrap();
    }

    let keys = liftplan_lib::resolve_keys(&plan);
    let by_key: Vec<&str> = keys.iter().map(|(k, _)| k.as_str()).collect();
    // Wednesday is slot 2
    assert_eq!(by_key, vec!["0-2-0", "0-2-1"]);

    // Removing the head renumbers: B now renders under the head key
    let plan = plan.remove_exercise(0, DayOfWeek::Wednesday, 0).unwrap();
    let keys = liftplan_lib::resolve_keys(&plan);
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].0, StableKey::for_coord(ExerciseCoord::new(0, DayOfWeek::Wednesday, 0)));
    assert_eq!(plan.exercise(0, DayOfWeek::Wednesday, 0).unwrap().name, "B");
}

#[test]
fn test_clone_week_mints_fresh_temp_identities() {
    let mut ids = TempIds::default();
    let plan = plan_with_monday(&["A", "B"]);
    let cloned = plan.clone_week(0, &mut ids).unwrap();

    assert_eq!(cloned.weeks.len(), 3);
    let copy = cloned.week(1).unwrap();
    assert!(copy.id.is_temp());
    for day in &copy.days {
        assert!(day.id.is_temp());
        for exercise in &day.exercises {
            assert!(exercise.id.is_temp());
        }
    }
    // Source identities untouched
    assert_eq!(cloned.week(0).unwrap().id, EntityId::Db(10));
}
