use std::sync::Arc;

use salt_live::detail::{DetailRenderer, Format};
use salt_live::display_item::DisplayItem;
use salt_live::event::SaltEvent;
use salt_live::history::HistoryBuffer;
use salt_live::visible::VisibleList;
use serde_json::json;

fn main() {
    divan::main();
}

fn make_event(idx: usize) -> SaltEvent {
    SaltEvent::new(
        format!("salt/job/2024010210101{idx:07}/ret/web{:02}", idx % 40),
        json!({
            "id": format!("web{:02}", idx % 40),
            "jid": format!("2024010210101{idx:07}"),
            "fun": "state.apply",
            "fun_args": ["nginx", "test=False"],
            "return": {
                "pkg_|-nginx_|-nginx_|-installed": {
                    "comment": "All specified packages are already installed\nnothing to do",
                    "result": true,
                    "changes": {},
                }
            },
            "retcode": 0,
            "success": true,
            "_stamp": "2024-01-02T10:10:10.654321",
        }),
    )
}

fn make_items(len: usize) -> Vec<Arc<DisplayItem>> {
    (0..len).map(|idx| Arc::new(DisplayItem::build_or_placeholder(&make_event(idx)))).collect()
}

#[divan::bench]
fn build_display_item(bencher: divan::Bencher) {
    let event = make_event(7);
    bencher.bench(|| divan::black_box(DisplayItem::build_or_placeholder(&event)));
}

#[divan::bench(args = [100usize, 1000usize, 5000usize])]
fn history_push_at_capacity(bencher: divan::Bencher, capacity: usize) {
    let items = make_items(capacity);
    bencher.counter(capacity).bench(|| {
        let mut history = HistoryBuffer::new(capacity / 2);
        for item in &items {
            divan::black_box(history.push(item.clone()));
        }
        history.len()
    });
}

#[divan::bench(args = [100usize, 1000usize, 5000usize])]
fn visible_resync(bencher: divan::Bencher, capacity: usize) {
    let mut history = HistoryBuffer::new(capacity);
    for item in make_items(capacity) {
        history.push(item);
    }
    let mut visible = VisibleList::new();
    bencher.counter(capacity).bench_local(|| {
        visible.resync(&history);
        visible.len()
    });
}

#[divan::bench(args = [false, true])]
fn render_detail(bencher: divan::Bencher, word_wrap: bool) {
    let renderer = DetailRenderer::default();
    let item = DisplayItem::build_or_placeholder(&make_event(3));
    bencher.bench_local(|| {
        let content = renderer.render(Some(&item), Format::Json, word_wrap);
        divan::black_box(content.map(|content| content.line_count()))
    });
}
