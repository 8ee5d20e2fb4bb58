//! End-to-end coverage of a fully wired grid stack.
//!
//! Builds the default composition (data → reorder → hide/show → group
//! expand/collapse → selection → viewport, with headers and a corner around
//! it) and drives it exclusively through commands entering at the top, the
//! way a host toolkit would.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis::prelude::*;

struct HeaderNames(Vec<&'static str>);

impl DataProvider for HeaderNames {
    fn column_count(&self) -> usize {
        self.0.len()
    }

    fn row_count(&self) -> usize {
        1
    }

    fn value(&self, column_index: usize, _row_index: usize) -> CellValue {
        self.0
            .get(column_index)
            .map_or(CellValue::None, |&name| CellValue::from(name))
    }
}

type BodyStack = SelectionLayer<
    GroupExpandCollapseLayer<HideShowLayer<ReorderLayer<DataLayer>>>,
>;

struct Fixture {
    data: Arc<DataLayer>,
    reorder: Arc<ReorderLayer<DataLayer>>,
    hide_show: Arc<HideShowLayer<ReorderLayer<DataLayer>>>,
    selection: Arc<BodyStack>,
    viewport: Arc<ViewportLayer<BodyStack>>,
    group_model: Arc<GroupModel>,
    grid: Arc<GridLayer>,
}

/// 6 columns x 8 rows of `row * 6 + column` values, 100px columns, 20px
/// rows, one group-header band, one label band, one row-header column.
fn fixture() -> Fixture {
    let config = GridConfig::default();
    let rows = (0..8)
        .map(|r| (0..6).map(|c| CellValue::from((r * 6 + c) as i64)).collect())
        .collect();
    let data = Arc::new(DataLayer::new(
        Arc::new(VecDataProvider::new(rows)),
        &config,
    ));
    let reorder = ReorderLayer::new(data.clone(), Axis::Column);
    let hide_show = HideShowLayer::new(reorder.clone(), Axis::Column);
    let group_model = Arc::new(GroupModel::new());
    let expand_collapse =
        GroupExpandCollapseLayer::new(hide_show.clone(), Axis::Column, group_model.clone());
    let selection = SelectionLayer::new(expand_collapse);
    let viewport = ViewportLayer::new(selection.clone());

    let labels: Arc<dyn Layer> = Arc::new(ColumnHeaderLayer::new(
        viewport.clone(),
        Arc::new(HeaderNames(vec!["a", "b", "c", "d", "e", "f"])),
        Some(selection.clone()),
        config.column_header_height,
    ));
    let column_header: Arc<dyn Layer> = GroupHeaderLayer::new(
        labels,
        group_model.clone(),
        selection.clone(),
        selection.clone(),
        Axis::Column,
        config.column_header_height,
    );
    let row_header: Arc<dyn Layer> = Arc::new(RowHeaderLayer::new(
        viewport.clone(),
        None,
        Some(selection.clone()),
        config.row_header_width,
    ));
    let corner: Arc<dyn Layer> =
        Arc::new(CornerLayer::new(row_header.clone(), column_header.clone()));

    let grid = GridLayer::new(corner, column_header, row_header, viewport.clone());
    // 640px: 40px row header + all six 100px columns.
    // 200px: two 20px header bands + all eight 20px rows.
    grid.do_command(&GridCommand::ClientAreaResize {
        width: 640,
        height: 200,
    });

    Fixture {
        data,
        reorder,
        hide_show,
        selection,
        viewport,
        group_model,
        grid,
    }
}

fn capture(layer: &dyn Layer) -> Arc<Mutex<Vec<StructuralEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    layer.events().connect(move |event: &StructuralEvent| {
        sink.lock().push(event.clone());
    });
    events
}

// ---------------------------------------------------------------------------
// Round-trip and transform properties
// ---------------------------------------------------------------------------

#[test]
fn round_trip_holds_on_every_layer_between_mutations() {
    let f = fixture();
    // Disturb the stack first so the round trip is checked on non-identity
    // mappings.
    f.grid.do_command(&GridCommand::MultiReorder {
        axis: Axis::Column,
        from_positions: vec![2, 4],
        to: 1,
        left_edge: true,
    });
    f.grid.do_command(&GridCommand::HidePositions {
        axis: Axis::Column,
        positions: vec![3],
    });

    let layers: Vec<&dyn Layer> = vec![
        &*f.data,
        &*f.reorder,
        &*f.hide_show,
        &*f.selection,
        &*f.viewport,
    ];
    for layer in layers {
        for axis in [Axis::Column, Axis::Row] {
            for position in 0..layer.count(axis) {
                let index = layer.index_of(axis, position).unwrap();
                assert_eq!(
                    layer.position_of(axis, index),
                    Some(position),
                    "round trip failed at {axis:?} position {position}"
                );
            }
        }
    }
}

#[test]
fn hide_then_show_restores_the_original_ordering() {
    let f = fixture();
    let original: Vec<usize> = (0..6)
        .map(|p| f.hide_show.index_of(Axis::Column, p).unwrap())
        .collect();

    // Hide grid columns 2 and 4 (body columns 1 and 3), then show them.
    f.grid.do_command(&GridCommand::HidePositions {
        axis: Axis::Column,
        positions: vec![2, 4],
    });
    assert_eq!(f.hide_show.count(Axis::Column), 4);
    f.grid.do_command(&GridCommand::ShowIndexes {
        axis: Axis::Column,
        indexes: vec![1, 3],
    });

    let restored: Vec<usize> = (0..6)
        .map(|p| f.hide_show.index_of(Axis::Column, p).unwrap())
        .collect();
    assert_eq!(original, restored);
}

#[test]
fn reorder_of_a_block_and_back_restores_the_permutation() {
    let f = fixture();
    // A move past the end of the axis degenerates to a no-op reorder.
    f.viewport.do_command(&GridCommand::MultiReorder {
        axis: Axis::Column,
        from_positions: vec![4, 5],
        to: 6,
        left_edge: true,
    });
    assert_eq!(f.reorder.permutation(), vec![0, 1, 2, 3, 4, 5]);

    let f = fixture();
    f.viewport.do_command(&GridCommand::MultiReorder {
        axis: Axis::Column,
        from_positions: vec![1, 2],
        to: 5,
        left_edge: true,
    });
    assert_eq!(f.reorder.permutation(), vec![0, 3, 4, 1, 2, 5]);

    // Move the block back to its original place.
    f.viewport.do_command(&GridCommand::MultiReorder {
        axis: Axis::Column,
        from_positions: vec![3, 4],
        to: 1,
        left_edge: true,
    });
    assert_eq!(f.reorder.permutation(), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn moving_a_pair_to_the_right_lands_after_the_removal_shift() {
    // The documented [4,5] → 8 case needs a 10-position axis.
    let rows = (0..2)
        .map(|r| (0..10).map(|c| CellValue::from((r * 10 + c) as i64)).collect())
        .collect();
    let data = Arc::new(DataLayer::new(
        Arc::new(VecDataProvider::new(rows)),
        &GridConfig::default(),
    ));
    let reorder = ReorderLayer::new(data, Axis::Column);
    reorder.do_command(&GridCommand::MultiReorder {
        axis: Axis::Column,
        from_positions: vec![4, 5],
        to: 8,
        left_edge: true,
    });
    // After the removal shift the block starts at 8 - 2 = 6.
    assert_eq!(reorder.index_of(Axis::Column, 6), Some(4));
    assert_eq!(reorder.index_of(Axis::Column, 7), Some(5));
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[test]
fn fully_selected_rows_follow_every_select_and_clear() {
    let f = fixture();
    // Select the whole of grid row 3 (body row 1) via the row axis.
    f.viewport.do_command(&GridCommand::SelectAxis {
        axis: Axis::Row,
        position: 1,
        shift: false,
        ctrl: false,
    });
    assert!(f.selection.is_fully_selected(Axis::Row, 1));
    assert_eq!(f.selection.fully_selected_positions(Axis::Row), vec![1]);

    // Fully selected means every single cell: knocking one out breaks it.
    f.viewport.do_command(&GridCommand::SelectCell {
        column: 2,
        row: 1,
        shift: false,
        ctrl: true,
    });
    assert!(!f.selection.is_fully_selected(Axis::Row, 1));

    // And re-adding it restores the derivation.
    f.viewport.do_command(&GridCommand::SelectCell {
        column: 2,
        row: 1,
        shift: false,
        ctrl: true,
    });
    assert!(f.selection.is_fully_selected(Axis::Row, 1));

    f.grid.do_command(&GridCommand::ClearSelection);
    assert!(f.selection.fully_selected_positions(Axis::Row).is_empty());
}

#[test]
fn header_reports_select_for_the_crossing_column() {
    let f = fixture();
    // Grid (2,2): one row-header column and two header bands in front, so
    // this is body cell (1,0).
    f.grid.do_command(&GridCommand::SelectCell {
        column: 2,
        row: 2,
        shift: false,
        ctrl: false,
    });
    assert!(f.selection.is_cell_selected(1, 0));

    // The label band crossing the selected column shows SELECT.
    assert_eq!(f.grid.display_mode(2, 1), DisplayMode::Select);
    assert_eq!(f.grid.display_mode(1, 1), DisplayMode::Normal);
    // So does the row header of the selected row.
    assert_eq!(f.grid.display_mode(0, 2), DisplayMode::Select);
    assert_eq!(f.grid.display_mode(0, 3), DisplayMode::Normal);
}

#[test]
fn selection_follows_indexes_across_reorders() {
    let f = fixture();
    f.viewport.do_command(&GridCommand::SelectCell {
        column: 1,
        row: 0,
        shift: false,
        ctrl: false,
    });

    f.viewport.do_command(&GridCommand::MultiReorder {
        axis: Axis::Column,
        from_positions: vec![1],
        to: 5,
        left_edge: true,
    });

    // Index 1 now sits at position 4 and carries its selection.
    assert_eq!(f.selection.position_of(Axis::Column, 1), Some(4));
    assert!(f.selection.is_cell_selected(4, 0));
    assert!(f.selection.is_index_selected(Axis::Column, 1));
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[test]
fn collapse_hides_members_minus_static_and_fires_one_event() {
    let f = fixture();
    f.group_model.add_group("A", &[2, 3, 4]);
    f.group_model.set_static("A", 2, true);

    let events = capture(&*f.selection);
    f.viewport.do_command(&GridCommand::ToggleGroupCollapse {
        axis: Axis::Column,
        position: 2,
    });

    // Exactly one hide event naming the two positions of indexes 3 and 4.
    let hides: Vec<_> = events
        .lock()
        .iter()
        .filter(|e| matches!(e, StructuralEvent::PositionsHidden { .. }))
        .cloned()
        .collect();
    assert_eq!(
        hides,
        vec![StructuralEvent::PositionsHidden {
            axis: Axis::Column,
            ranges: vec![Range::new(3, 5)],
        }]
    );
    // The static member stays visible throughout.
    assert_eq!(f.selection.position_of(Axis::Column, 2), Some(2));
    assert_eq!(f.selection.position_of(Axis::Column, 3), None);
    assert_eq!(f.selection.count(Axis::Column), 4);

    // Expanding restores exactly the same set.
    f.viewport.do_command(&GridCommand::ToggleGroupCollapse {
        axis: Axis::Column,
        position: 2,
    });
    assert_eq!(f.selection.count(Axis::Column), 6);
    assert_eq!(f.selection.position_of(Axis::Column, 3), Some(3));
    assert_eq!(f.selection.position_of(Axis::Column, 2), Some(2));
}

#[test]
fn grouping_selected_columns_reorders_them_contiguous() {
    let f = fixture();
    // Fully select body columns 1 and 4 through the grid.
    f.grid.do_command(&GridCommand::SelectAxis {
        axis: Axis::Column,
        position: 2,
        shift: false,
        ctrl: false,
    });
    f.grid.do_command(&GridCommand::SelectAxis {
        axis: Axis::Column,
        position: 5,
        shift: false,
        ctrl: true,
    });

    assert!(f.grid.do_command(&GridCommand::CreateGroup {
        axis: Axis::Column,
        name: "pair".to_string(),
    }));

    let group = f.group_model.group_by_name("pair").unwrap();
    assert_eq!(group.members(), &[1, 4]);
    // The members are contiguous in the body now.
    assert_eq!(f.selection.position_of(Axis::Column, 1), Some(1));
    assert_eq!(f.selection.position_of(Axis::Column, 4), Some(2));

    // The group band paints one spanned cell over both members.
    let cell = f.grid.cell(2, 0).unwrap();
    assert_eq!(cell.value, CellValue::from("pair"));
    assert_eq!(cell.column_span, 2);
    assert_eq!(cell.origin_column, 2);
}

#[test]
fn ungrouping_everything_dissolves_the_group() {
    let f = fixture();
    f.group_model.add_group("A", &[0, 1]);
    f.grid.do_command(&GridCommand::SelectAxis {
        axis: Axis::Column,
        position: 1,
        shift: false,
        ctrl: false,
    });

    assert!(f.grid.do_command(&GridCommand::Ungroup { axis: Axis::Column }));
    // Removing one of two members leaves a trivial group, which dissolves.
    assert!(f.group_model.group_by_name("A").is_none());
}

// ---------------------------------------------------------------------------
// Sizing
// ---------------------------------------------------------------------------

#[test]
fn percentage_widths_fill_the_budget_exactly() {
    let f = fixture();
    f.data.set_percentage_sizing(Axis::Column, true);
    f.data.set_fixed_pixel(Axis::Column, 0, true);
    f.data.set_size(Axis::Column, 0, 97);

    // An awkward budget that does not divide evenly.
    f.viewport.do_command(&GridCommand::ClientAreaResize {
        width: 617,
        height: 160,
    });

    let total: u32 = (0..6)
        .map(|p| f.data.extent(Axis::Column, p).unwrap())
        .sum();
    assert_eq!(f.data.extent(Axis::Column, 0), Some(97));
    // Participants fill the remaining budget to the pixel.
    assert_eq!(total, 617);
}

#[test]
fn resize_through_the_grid_fires_translated_events() {
    let f = fixture();
    let events = capture(&*f.grid);

    // Grid column 3 is body column 2.
    assert!(f.grid.do_command(&GridCommand::ResizePosition {
        axis: Axis::Column,
        position: 3,
        size: 140,
    }));
    assert_eq!(f.grid.extent(Axis::Column, 3), Some(140));
    assert!(events.lock().iter().any(|event| matches!(
        event,
        StructuralEvent::PositionsResized { axis: Axis::Column, ranges }
            if ranges == &vec![Range::single(3)]
    )));
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

#[test]
fn scrolling_the_grid_body_keeps_headers_aligned() {
    let f = fixture();
    // Shrink the viewport so only 3 columns and 4 rows fit.
    f.grid.do_command(&GridCommand::ClientAreaResize {
        width: 340,
        height: 120,
    });
    f.viewport.do_command(&GridCommand::ScrollBy {
        axis: Axis::Column,
        delta: 2,
    });

    // Grid column 1 is now body column 2 everywhere, including the header.
    assert_eq!(f.grid.value(1, 2), CellValue::Int(2));
    assert_eq!(f.grid.value(1, 1), CellValue::from("c"));
    assert_eq!(f.grid.index_of(Axis::Column, 1), Some(2));
}

#[test]
fn tail_can_never_be_scrolled_fully_out() {
    let f = fixture();
    f.grid.do_command(&GridCommand::ClientAreaResize {
        width: 340,
        height: 120,
    });
    f.viewport
        .do_command(&GridCommand::ScrollBy { axis: Axis::Row, delta: 999 });

    // 80px of body height shows 4 rows; the origin clamps to 8 - 4 = 4.
    assert_eq!(f.viewport.origin(Axis::Row), 4);
    assert_eq!(f.viewport.count(Axis::Row), 4);
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[test]
fn collapsing_a_group_row_removes_exactly_its_descendants() {
    // 18 leaf rows under 2 header rows: 20 rows total.
    let mut parents = vec![None; 20];
    for row in 1..10 {
        parents[row] = Some(0);
    }
    for row in 11..20 {
        parents[row] = Some(10);
    }
    let model = Arc::new(TreeRowModel::new(parents));

    let rows = (0..20)
        .map(|r| vec![CellValue::from(r as i64)])
        .collect();
    let data = Arc::new(DataLayer::new(
        Arc::new(VecDataProvider::new(rows)),
        &GridConfig::default(),
    ));
    let tree = TreeLayer::new(data, model.clone());
    assert_eq!(tree.count(Axis::Row), 20);

    let descendants = model.descendants(0).len();
    assert!(tree.do_command(&GridCommand::ToggleTreeCollapse { row: 0 }));
    assert_eq!(tree.count(Axis::Row), 20 - descendants);

    // The second group is untouched and the relation is intact.
    assert_eq!(tree.position_of(Axis::Row, 10), Some(1));
    assert_eq!(model.children(0).len(), 9);
}

// ---------------------------------------------------------------------------
// Dispatch contract
// ---------------------------------------------------------------------------

#[test]
fn unhandled_commands_fall_out_the_bottom_as_false() {
    let f = fixture();
    // No tree layer in this stack: the command converts all the way down
    // and nobody accepts it.
    assert!(!f.grid.do_command(&GridCommand::TreeExpandAll));
}

#[test]
fn update_data_writes_through_the_whole_stack() {
    let f = fixture();
    // Shuffle the columns so the write has to convert through the
    // permutation: grid column 1 is body position 0.
    f.viewport.do_command(&GridCommand::MultiReorder {
        axis: Axis::Column,
        from_positions: vec![3],
        to: 0,
        left_edge: true,
    });

    assert!(f.grid.do_command(&GridCommand::UpdateData {
        column: 1,
        row: 2,
        value: CellValue::from("edited"),
    }));
    // Body position 0 is index 3; the write landed on the data row 0.
    assert_eq!(f.data.value(3, 0), CellValue::from("edited"));
    assert_eq!(f.grid.value(1, 2), CellValue::from("edited"));
}

#[test]
fn registered_handlers_intercept_before_builtins() {
    let f = fixture();
    let intercepted = Arc::new(Mutex::new(0));
    let hits = intercepted.clone();
    f.grid
        .core()
        .register_handler(CommandKind::SelectAll, move |_| {
            *hits.lock() += 1;
            true
        });

    assert!(f.grid.do_command(&GridCommand::SelectAll));
    assert_eq!(*intercepted.lock(), 1);
    // The selection layer never saw it.
    assert!(!f.selection.has_selection());
}
