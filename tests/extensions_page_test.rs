mod common;

use anyhow::{Context, Result};
use common::{harness, FakeFetcher, FakeGallery, Harness, HEADER_HEIGHT, LIST_HEIGHT, ROW_HEIGHT};
use nohrs_extensions::pages::extensions::{ContentState, Phase};
use nohrs_extensions::pages::Page;
use nohrs_extensions::ui::element::Rect;
use nohrs_extensions::ui::theme::classes;
use std::time::Duration;
use tokio::task::LocalSet;

async fn searched(h: &mut Harness, text: &str) -> Result<()> {
    h.page.set_visible(true);
    h.page
        .search_now(text)
        .context("view not created")?
        .await
        .context("search was superseded")
}

fn first_id(h: &Harness) -> Option<String> {
    h.page
        .list()?
        .rendered_rows()
        .into_iter()
        .next()
        .and_then(|(_, entry)| entry)
        .map(|entry| entry.id())
}

fn body_markup(h: &Harness, index: usize) -> Option<String> {
    let template = h.page.list()?.template_for(index)?;
    h.page.tree().borrow().markup(template.body).map(str::to_string)
}

// ============================================================================
// Searching
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_initial_visibility_runs_one_empty_search() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(0));
            h.page.set_visible(true);
            assert!(h.page.is_loading());

            tokio::time::sleep(Duration::from_secs(1)).await;

            assert_eq!(*h.queries.borrow(), vec![String::new()]);
            let list = h.page.list().context("list")?;
            assert_eq!(list.model().len(), 0);
            assert!(list.rendered_rows().is_empty());
            assert!(h.page_calls.borrow().is_empty());
            assert!(!h.page.is_loading());
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_fast_typing_sends_only_the_last_query() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(0));
            h.page.set_visible(true);
            tokio::time::sleep(Duration::from_secs(1)).await;

            let _ = h.page.set_query("foo");
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = h.page.set_query("foobar");
            assert!(h.page.is_loading());

            tokio::time::sleep(Duration::from_secs(2)).await;

            assert_eq!(*h.queries.borrow(), vec![String::new(), "foobar".to_string()]);
            assert_eq!(first_id(&h).as_deref(), Some("pub.foobar-0"));
            assert_eq!(h.page.query(), "foobar");
            assert!(!h.page.is_loading());
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_superseded_search_result_is_never_shown() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut gallery = FakeGallery::new(100);
            gallery.latency = Duration::from_millis(300);
            let mut h = harness(gallery, FakeFetcher::with_readmes(0));
            h.page.set_visible(true);
            tokio::time::sleep(Duration::from_secs(1)).await;

            let _ = h.page.search_now("alpha");
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = h.page.search_now("beta");

            // alpha has resolved by now, beta has not.
            tokio::time::sleep(Duration::from_millis(295)).await;
            assert_eq!(h.page.list().context("list")?.model().len(), 0);
            assert!(h.page.is_loading());

            tokio::time::sleep(Duration::from_secs(1)).await;
            assert_eq!(
                *h.queries.borrow(),
                vec![String::new(), "alpha".to_string(), "beta".to_string()]
            );
            assert_eq!(first_id(&h).as_deref(), Some("pub.beta-0"));
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_failed_search_shows_empty_list() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(
                FakeGallery::new(100).failing_on("broken"),
                FakeFetcher::with_readmes(0),
            );
            searched(&mut h, "ok").await?;
            assert_eq!(first_id(&h).as_deref(), Some("pub.ok-0"));

            searched(&mut h, "broken").await?;

            let list = h.page.list().context("list")?;
            assert_eq!(list.model().len(), 0);
            assert!(list.rendered_rows().is_empty());
            assert!(!h.page.is_loading());
            Ok(())
        })
        .await
}

// ============================================================================
// Highlight
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_selected_row_moves_into_overlay_and_loads_readme() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(10));
            searched(&mut h, "ext").await?;

            let list = h.page.list().context("list")?.clone();
            let highlight = h.page.highlight().context("highlight")?.clone();
            let tree = std::rc::Rc::clone(h.page.tree());
            let overlay = highlight.overlay();
            let row = list.template_for(1).context("row 1 rendered")?.container;
            let passes = tree.borrow().layout_passes();

            assert!(h.page.select(1));

            assert_eq!(highlight.phase(), Phase::Expanding);
            assert_eq!(tree.borrow().parent(row), Some(overlay));
            assert!(tree.borrow().layout_passes() > passes);
            assert_eq!(
                tree.borrow().committed_frame(overlay),
                Rect::new(HEADER_HEIGHT + ROW_HEIGHT, 0.0, 400.0, ROW_HEIGHT)
            );
            let running = tree.borrow().running_transitions().to_vec();
            assert_eq!(running.len(), 1);
            assert_eq!(running[0].to, Rect::new(HEADER_HEIGHT, 0.0, 400.0, LIST_HEIGHT));

            assert_eq!(h.page.finish_transitions(), 1);
            assert_eq!(highlight.phase(), Phase::Expanded);
            assert!(tree.borrow().has_class(overlay, classes::SETTLED));

            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(highlight.content_state(), Some(ContentState::Loaded));
            assert_eq!(body_markup(&h, 1).as_deref(), Some("<p>readme 1</p>"));

            assert_eq!(h.proxy.calls.get(), 1);
            let requests = h.requests.borrow();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].url, "readme-1.md");
            assert_eq!(requests[0].proxy_url.as_deref(), Some("http://proxy.local:3128"));
            assert!(!requests[0].strict_ssl);
            assert_eq!(requests[0].header("X-Extension-Id"), Some("pub.ext-1"));
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_selecting_another_row_collapses_the_first() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(10));
            searched(&mut h, "ext").await?;

            let list = h.page.list().context("list")?.clone();
            let highlight = h.page.highlight().context("highlight")?.clone();
            let tree = std::rc::Rc::clone(h.page.tree());
            let first = list.template_for(0).context("row 0")?.container;
            let second = list.template_for(1).context("row 1")?.container;

            assert!(h.page.select(0));
            h.page.finish_transitions();
            assert!(h.page.select(1));

            assert_eq!(highlight.active_index(), Some(1));
            assert_eq!(tree.borrow().parent(first), Some(list.element()));
            assert_eq!(tree.borrow().parent(second), Some(highlight.overlay()));
            assert!(!list.is_leased(0));
            assert!(list.is_leased(1));

            // The first fetch was cancelled and never lands.
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert_eq!(h.requests.borrow().len(), 2);
            assert_eq!(body_markup(&h, 0), None);
            assert_eq!(body_markup(&h, 1).as_deref(), Some("<p>readme 1</p>"));
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_collapse_is_idempotent() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(10));
            searched(&mut h, "ext").await?;

            let list = h.page.list().context("list")?.clone();
            let highlight = h.page.highlight().context("highlight")?.clone();
            let tree = std::rc::Rc::clone(h.page.tree());
            let row = list.template_for(2).context("row 2")?.container;

            assert!(h.page.select(2));
            h.page.finish_transitions();
            tokio::time::sleep(Duration::from_millis(100)).await;

            h.page.click_root();
            highlight.collapse();
            highlight.collapse();

            assert_eq!(highlight.phase(), Phase::Collapsing);
            assert_eq!(list.selection(), None);
            let occurrences = tree
                .borrow()
                .children(list.element())
                .iter()
                .filter(|child| **child == row)
                .count();
            assert_eq!(occurrences, 1);
            assert_eq!(body_markup(&h, 2), None);

            h.page.finish_transitions();
            assert_eq!(highlight.phase(), Phase::Idle);
            assert!(tree.borrow().has_class(highlight.overlay(), classes::HIDDEN));

            highlight.collapse();
            assert_eq!(highlight.phase(), Phase::Idle);
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_overlay_starts_at_scrolled_row_position() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(30));
            searched(&mut h, "ext").await?;

            let list = h.page.list().context("list")?.clone();
            let highlight = h.page.highlight().context("highlight")?.clone();
            let tree = std::rc::Rc::clone(h.page.tree());

            // Row 21 sits half a row below the top of the viewport.
            list.set_scroll_top(21.0 * ROW_HEIGHT - 31.0);
            assert_eq!(list.row_bounds(21).top, 31.0);
            assert!(h.page.select(21));

            assert_eq!(highlight.active_index(), Some(21));
            assert_eq!(
                tree.borrow().committed_frame(highlight.overlay()),
                Rect::new(HEADER_HEIGHT + 31.0, 0.0, 400.0, ROW_HEIGHT)
            );
            let running = tree.borrow().running_transitions().to_vec();
            assert_eq!(running[0].to, Rect::new(HEADER_HEIGHT, 0.0, 400.0, LIST_HEIGHT));
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_offscreen_row_is_selectable_once_scrolled_into_view() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(10));
            searched(&mut h, "ext").await?;

            let list = h.page.list().context("list")?.clone();
            let highlight = h.page.highlight().context("highlight")?.clone();

            // Row 30 is loaded but not rendered.
            assert!(list.model().is_resolved(30));
            assert!(!h.page.select(30));
            assert_eq!(list.selection(), None);
            assert!(!highlight.is_active());

            list.scroll_to_index(30);
            h.page.click_at(HEADER_HEIGHT + 1.0);

            assert_eq!(list.selection(), Some(30));
            assert_eq!(highlight.active_index(), Some(30));
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_failed_readme_leaves_overlay_expanded_and_empty() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(0));
            searched(&mut h, "ext").await?;
            let highlight = h.page.highlight().context("highlight")?.clone();

            assert!(h.page.select(0));
            assert_eq!(highlight.content_state(), Some(ContentState::Pending));
            h.page.finish_transitions();
            tokio::time::sleep(Duration::from_millis(100)).await;

            assert_eq!(highlight.phase(), Phase::Expanded);
            assert_eq!(highlight.content_state(), Some(ContentState::Failed));
            assert_eq!(
                highlight.active_entry().map(|e| e.id()).as_deref(),
                Some("pub.ext-0")
            );
            assert_eq!(body_markup(&h, 0), None);
            assert!(!h
                .page
                .tree()
                .borrow()
                .has_class(highlight.overlay(), classes::HAS_CONTENT));
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_content_arriving_after_collapse_is_dropped() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(10));
            searched(&mut h, "ext").await?;
            let highlight = h.page.highlight().context("highlight")?.clone();

            assert!(h.page.select(0));
            h.page.click_root();
            tokio::time::sleep(Duration::from_millis(200)).await;

            assert_eq!(h.requests.borrow().len(), 1);
            assert_eq!(highlight.content_state(), None);
            assert_eq!(body_markup(&h, 0), None);
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_overlay_swallows_clicks_while_highlighted() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(10));
            searched(&mut h, "ext").await?;

            h.page.click_at(HEADER_HEIGHT + ROW_HEIGHT * 3.0 + 1.0);
            let highlight = h.page.highlight().context("highlight")?.clone();
            assert_eq!(highlight.active_index(), Some(3));

            h.page.click_at(HEADER_HEIGHT + ROW_HEIGHT * 5.0 + 1.0);
            assert_eq!(highlight.active_index(), Some(3));
            assert_eq!(h.page.list().context("list")?.selection(), Some(3));

            // Clicks on the header never reach the list.
            h.page.click_root();
            h.page.click_at(HEADER_HEIGHT - 1.0);
            assert_eq!(h.page.list().context("list")?.selection(), None);
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_new_search_collapses_highlight() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(10));
            searched(&mut h, "ext").await?;
            let highlight = h.page.highlight().context("highlight")?.clone();

            assert!(h.page.select(0));
            h.page.finish_transitions();
            searched(&mut h, "other").await?;

            assert!(!highlight.is_active());
            assert_eq!(first_id(&h).as_deref(), Some("pub.other-0"));
            h.page.finish_transitions();
            assert_eq!(highlight.phase(), Phase::Idle);
            Ok(())
        })
        .await
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_hiding_the_view_collapses_highlight() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(10));
            searched(&mut h, "ext").await?;
            let highlight = h.page.highlight().context("highlight")?.clone();
            let root = h.page.root().context("root")?;

            assert!(h.page.select(0));
            h.page.set_visible(false);

            assert!(!highlight.is_active());
            assert!(h.page.tree().borrow().has_class(root, classes::HIDDEN));
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_dispose_cancels_pending_search_and_listeners() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(10));
            h.page.set_visible(true);
            tokio::time::sleep(Duration::from_secs(1)).await;

            let list = h.page.list().context("list")?.clone();
            let root = h.page.root().context("root")?;
            let tree = std::rc::Rc::clone(h.page.tree());

            let _ = h.page.set_query("foo");
            h.page.dispose();
            tokio::time::sleep(Duration::from_secs(2)).await;

            assert_eq!(*h.queries.borrow(), vec![String::new()]);
            assert_eq!(tree.borrow().parent(root), None);
            assert_eq!(list.listener_count(), 0);
            assert!(h.page.list().is_none());
            assert!(h.page.set_query("bar").is_none());
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_focus_moves_to_search_box() -> Result<()> {
    LocalSet::new()
        .run_until(async {
            let mut h = harness(FakeGallery::new(100), FakeFetcher::with_readmes(0));
            h.page.focus();
            let search_box = h.page.search_box().context("search box")?;
            assert_eq!(h.page.tree().borrow().focused(), Some(search_box));
            Ok(())
        })
        .await
}
