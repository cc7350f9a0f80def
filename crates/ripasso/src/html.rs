use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use crate::calendar::{DayCell, MonthBucket};
use crate::dates::{abbreviate, canonical_date_key};
use crate::plan::{CALENDAR_NAME_LEN, DAILY_TIMETABLE};
use crate::progress::{meter_segments, ProgressReport, METER_SEGMENTS};
use crate::state::StudyState;
use crate::tracker::Tracker;
use crate::types::{MockExam, Subject, TopicKey};

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Write the dashboard as a static HTML file
pub fn generate_html(tracker: &Tracker, path: &Path) -> Result<()> {
    let html = render_page(tracker);
    fs::write(path, html.into_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn render_page(tracker: &Tracker) -> Markup {
    let progress = tracker.progress();
    let state = tracker.state();

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Ripasso" }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    h1 { "Ripasso" }
                    div.stats {
                        span #"overall-percent" { (format!("{:.2}", progress.overall_percent)) "%" }
                        " overall"
                    }
                    (render_meters(&progress))
                    (render_timetable())
                    section #calendar {
                        h2 { "Calendar" }
                        button.clear-days type="button" disabled[state.days.is_empty()] { "Clear day marks" }
                        @for month in tracker.calendar() {
                            (render_month(month, state))
                        }
                    }
                    (render_mocks(tracker.mocks()))
                    section #subjects {
                        h2 { "Subjects" }
                        @for subject in tracker.plan() {
                            (render_subject(subject, state))
                        }
                    }
                }
                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    }
}

fn render_meters(progress: &ProgressReport) -> Markup {
    html! {
        div.meters {
            (render_meter(
                "Subjects",
                progress.subject_percent,
                format!("{}/{}", progress.subjects_done, progress.subjects_total),
            ))
            (render_meter(
                "Mocks",
                progress.mock_percent,
                format!("{}/{}", progress.mocks_done, progress.mocks_total),
            ))
            div.counts {
                span { (progress.topics_done) "/" (progress.topics_total) " topics" }
                span { (progress.days_done) "/" (progress.days_total) " days" }
            }
        }
    }
}

fn render_meter(label: &str, percent: f64, count: String) -> Markup {
    let filled = meter_segments(percent);
    html! {
        div.meter {
            span.meter-label { (label) }
            span.meter-bar {
                @for segment in 0..METER_SEGMENTS {
                    @let lit = segment < filled;
                    span.segment.filled[lit] {}
                }
            }
            span.meter-count { (count) " · " (format!("{:.0}", percent)) "%" }
        }
    }
}

fn render_timetable() -> Markup {
    html! {
        section #timetable {
            h2 { "Daily timetable" }
            ul.timetable {
                @for slot in DAILY_TIMETABLE {
                    li {
                        span.slot-hours { (slot.hours) }
                        span.slot-activity { (slot.activity) }
                    }
                }
            }
        }
    }
}

fn render_month(month: &MonthBucket, state: &StudyState) -> Markup {
    html! {
        div.month {
            div.month-header { (month.label) }
            table.month-grid {
                thead {
                    tr {
                        @for day in WEEKDAYS {
                            th { (day) }
                        }
                    }
                }
                tbody {
                    @for week in &month.weeks {
                        tr {
                            @for cell in week {
                                @if let Some(day) = cell.day() {
                                    (render_day(day, state))
                                } @else {
                                    td.blank {}
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn render_day(day: &DayCell, state: &StudyState) -> Markup {
    let done = state.days.is_done(&day.date);
    html! {
        td.day.scheduled[day.is_scheduled].completed[done] data-date=(day.date_key()) {
            span.day-number { (chrono::Datelike::day(&day.date)) }
            @if let Some(entry) = &day.schedule_entry {
                span.day-subject title=(entry.subject_name) {
                    (abbreviate(&entry.subject_name, CALENDAR_NAME_LEN))
                }
                span.day-index { "Day " (entry.day_index) }
            }
        }
    }
}

fn render_mocks(mocks: &[MockExam]) -> Markup {
    html! {
        section #mocks {
            h2 { "Mock exams" }
            @if mocks.is_empty() {
                div.empty-state {
                    p { "No mock exams scheduled." }
                }
            }
            @for mock in mocks {
                div.item.mock.completed[mock.done] {
                    input.checkbox.mock-checkbox type="checkbox" data-mock-id=(mock.id) checked[mock.done];
                    div.item-content {
                        div.item-title { "Mock " (mock.id) }
                        div.item-date { (canonical_date_key(&mock.date)) }
                        input.note.mock-note type="text" placeholder="Score, weak areas..."
                            data-mock-id=(mock.id) value=(mock.note);
                    }
                }
            }
        }
    }
}

fn render_subject(subject: &Subject, state: &StudyState) -> Markup {
    let done = state.subjects.contains(subject.number);
    html! {
        div.subject.completed[done] {
            div.item {
                input.checkbox.subject-checkbox type="checkbox"
                    data-subject=(subject.number) checked[done];
                div.item-content {
                    div.item-title { (subject.number) ". " (subject.name) }
                    div.item-date { (subject.duration_days) " days" }
                }
            }
            ul.topics {
                @for (idx, topic) in subject.topics.iter().enumerate() {
                    @let key = TopicKey::new(subject.number, idx);
                    @let topic_done = state.topics.is_done(&key);
                    li.topic.completed[topic_done] {
                        input.checkbox.topic-checkbox type="checkbox"
                            data-subject=(subject.number) data-topic=(idx) checked[topic_done];
                        span.topic-name { (topic) }
                        input.note.topic-note type="text" placeholder="Notes"
                            data-subject=(subject.number) data-topic=(idx)
                            value=(state.notes.get(&key));
                    }
                }
            }
        }
    }
}

const CSS: &str = r#"
@import url('https://fonts.googleapis.com/css2?family=Inter:wght@400;700;900&display=swap');

* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: 'Inter', -apple-system, BlinkMacSystemFont, sans-serif;
    background: #0a0a0a;
    color: #fff;
    min-height: 100vh;
    line-height: 1.4;
    overflow-x: hidden;
}

.container {
    max-width: 1000px;
    margin: 0 auto;
    padding: 40px 24px 60px;
}

h1 {
    font-weight: 900;
    font-size: 4em;
    letter-spacing: -0.03em;
    text-transform: uppercase;
    text-shadow: 4px 4px 0 #ff0096, -2px -2px 0 #00ffff;
    transform: rotate(-1deg);
}

h2 {
    font-size: 1.1em;
    font-weight: 900;
    text-transform: uppercase;
    letter-spacing: 0.15em;
    margin: 50px 0 20px;
    text-shadow: 0 0 8px rgba(0,255,255,0.6);
}

.stats {
    color: #888;
    font-size: 0.85em;
    font-weight: 700;
    margin-bottom: 30px;
    text-transform: uppercase;
    letter-spacing: 0.1em;
}

#overall-percent {
    color: #00ffff;
    font-size: 2em;
}

.meter {
    display: flex;
    align-items: center;
    gap: 16px;
    margin-bottom: 10px;
}

.meter-label {
    width: 90px;
    font-weight: 700;
    text-transform: uppercase;
    font-size: 0.8em;
}

.meter-bar {
    display: flex;
    gap: 3px;
}

.segment {
    width: 22px;
    height: 12px;
    border: 1px solid rgba(255,255,255,0.2);
}

.segment.filled {
    background: linear-gradient(135deg, #ff0096, #00ffff);
    box-shadow: 0 0 6px rgba(255,0,150,0.5);
}

.meter-count, .counts {
    color: #888;
    font-size: 0.8em;
}

.counts {
    display: flex;
    gap: 24px;
    margin-top: 8px;
}

.timetable {
    list-style: none;
    display: grid;
    gap: 8px;
}

.timetable li {
    display: flex;
    gap: 20px;
    padding: 10px 16px;
    background: rgba(255,255,255,0.03);
    border-left: 3px solid #ff0096;
}

.slot-hours {
    width: 160px;
    color: #00ffff;
    font-weight: 700;
}

.month {
    margin-bottom: 30px;
}

.month-header {
    font-weight: 700;
    text-transform: uppercase;
    margin-bottom: 10px;
}

.month-grid {
    width: 100%;
    border-collapse: collapse;
    table-layout: fixed;
}

.month-grid th {
    color: #888;
    font-size: 0.75em;
    padding: 6px;
}

.month-grid td {
    height: 70px;
    vertical-align: top;
    padding: 6px;
    border: 1px solid rgba(255,255,255,0.08);
    font-size: 0.75em;
}

.day.scheduled {
    background: rgba(255,255,255,0.04);
    cursor: pointer;
}

.day.scheduled:hover {
    border-color: rgba(255,0,150,0.6);
}

.day.completed {
    background: rgba(0,255,255,0.15);
}

.day-number {
    display: block;
    font-weight: 900;
}

.day-subject {
    display: block;
    color: #ccc;
}

.day-index {
    color: #ff0096;
}

.clear-days {
    background: none;
    color: #888;
    border: 1px solid #444;
    padding: 6px 12px;
    margin-bottom: 16px;
    cursor: pointer;
    text-transform: uppercase;
    font-size: 0.7em;
    letter-spacing: 0.1em;
}

.item {
    display: flex;
    align-items: flex-start;
    gap: 20px;
    padding: 16px 20px;
    margin-bottom: 12px;
    background: rgba(255,255,255,0.03);
    border: 1px solid rgba(255,255,255,0.1);
}

.item-content {
    flex: 1;
}

.item-title {
    font-weight: 700;
    text-transform: uppercase;
    letter-spacing: 0.05em;
}

.item-date {
    color: #888;
    font-size: 0.85em;
}

.completed > .item-content .item-title,
.subject.completed > .item .item-title,
.topic.completed .topic-name {
    text-decoration: line-through;
    opacity: 0.5;
}

.checkbox {
    width: 20px;
    height: 20px;
    min-width: 20px;
    cursor: pointer;
    accent-color: #ff0096;
}

.note {
    width: 100%;
    margin-top: 8px;
    background: transparent;
    color: #ccc;
    border: none;
    border-bottom: 1px solid #333;
    padding: 4px 0;
    font: inherit;
    font-size: 0.85em;
}

.topics {
    list-style: none;
    margin: -4px 0 24px 40px;
}

.topic {
    display: grid;
    grid-template-columns: 24px 200px 1fr;
    align-items: center;
    gap: 12px;
    padding: 4px 0;
}

.topic .note {
    margin-top: 0;
}

.empty-state {
    padding: 40px 20px;
    text-align: center;
    color: #666;
    font-size: 0.9em;
}

@media (max-width: 768px) {
    h1 {
        font-size: 2.6em;
    }

    .container {
        padding: 30px 16px 40px;
    }

    .topic {
        grid-template-columns: 24px 1fr;
    }
}
"#;

const JAVASCRIPT: &str = r#"
// Send one action to the server, then reload to show the new state
async function dispatch(action) {
    try {
        const res = await fetch('/api/actions', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify(action),
        });
        if (!res.ok) {
            const body = await res.json().catch(() => ({}));
            console.error('Action rejected', body.error || res.status);
        }
    } catch (err) {
        // Static build: no server to talk to
        console.error('Action failed', err);
        return;
    }
    location.reload();
}

document.querySelectorAll('.subject-checkbox').forEach(el => {
    el.addEventListener('change', () =>
        dispatch({ type: 'toggleSubject', number: Number(el.dataset.subject) }));
});

document.querySelectorAll('.topic-checkbox').forEach(el => {
    el.addEventListener('change', () => dispatch({
        type: 'toggleTopic',
        subject: Number(el.dataset.subject),
        topic: Number(el.dataset.topic),
    }));
});

document.querySelectorAll('.topic-note').forEach(el => {
    el.addEventListener('change', () => dispatch({
        type: 'setTopicNote',
        subject: Number(el.dataset.subject),
        topic: Number(el.dataset.topic),
        text: el.value,
    }));
});

document.querySelectorAll('.mock-checkbox').forEach(el => {
    el.addEventListener('change', () =>
        dispatch({ type: 'toggleMock', id: Number(el.dataset.mockId) }));
});

document.querySelectorAll('.mock-note').forEach(el => {
    el.addEventListener('change', () => dispatch({
        type: 'setMockNote',
        id: Number(el.dataset.mockId),
        text: el.value,
    }));
});

document.querySelectorAll('.day.scheduled').forEach(el => {
    el.addEventListener('click', () =>
        dispatch({ type: 'toggleDay', date: el.dataset.date }));
});

document.querySelectorAll('.clear-days').forEach(el => {
    el.addEventListener('click', () => {
        if (confirm('Clear all day marks?')) {
            dispatch({ type: 'clearDays' });
        }
    });
});
"#;
