//! Server-rendered pages. Dynamic values are escaped on the way in; scripts
//! are static and read what they need from `data-*` attributes.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use super::CurrentUser;
use crate::types::{Blueprint, BlueprintSummary, OrchestratorHealth, STEP_PREVIEW_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
    ForgotPassword,
}

impl AuthMode {
    /// Unknown or missing modes fall back to the sign-in form.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("signup") => AuthMode::Signup,
            Some("forgot_password") => AuthMode::ForgotPassword,
            _ => AuthMode::Login,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthMode::Login => "login",
            AuthMode::Signup => "signup",
            AuthMode::ForgotPassword => "forgot_password",
        }
    }

    fn headline(self) -> &'static str {
        match self {
            AuthMode::Login => "Sign in to orchestrate your agents.",
            AuthMode::Signup => "Create an account to get started.",
            AuthMode::ForgotPassword => "Reset your password.",
        }
    }

    fn submit_label(self) -> &'static str {
        match self {
            AuthMode::Login => "Sign In",
            AuthMode::Signup => "Create Account",
            AuthMode::ForgotPassword => "Send Reset Link",
        }
    }
}

/// Inline feedback under the login form.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    None,
    Error(String),
    Message(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Agents,
    Studio,
    Blueprints,
    Execution,
}

const NAVIGATION: [(Nav, &str, &str); 4] = [
    (Nav::Agents, "Agents", "/dashboard"),
    (Nav::Studio, "Studio", "/dashboard/studio"),
    (Nav::Blueprints, "Blueprints", "/dashboard/blueprints"),
    (Nav::Execution, "Execution", "/dashboard/execution"),
];

const STYLE: &str = r#"
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body { background: #09090b; color: #e4e4e7; font-family: 'Segoe UI', system-ui, -apple-system, sans-serif; min-height: 100vh; }
  a { color: inherit; text-decoration: none; }
  .shell { display: flex; min-height: 100vh; }
  aside { width: 240px; border-right: 1px solid #1f1f23; padding: 24px 16px; display: flex; flex-direction: column; gap: 4px; }
  aside .brand { font-size: 18px; font-weight: 700; color: #fff; margin-bottom: 24px; padding: 0 12px; }
  aside nav a { display: block; padding: 10px 12px; border-radius: 8px; color: #a1a1aa; }
  aside nav a:hover { background: #18181b; color: #f4f4f5; }
  aside nav a.active { background: rgba(99,102,241,0.12); color: #818cf8; font-weight: 600; }
  aside .account { margin-top: auto; padding: 12px; font-size: 13px; color: #71717a; }
  main { flex: 1; padding: 32px 40px; overflow-y: auto; }
  h1 { font-size: 26px; color: #fff; margin-bottom: 8px; }
  p.lead { color: #a1a1aa; max-width: 760px; line-height: 1.6; margin-bottom: 24px; }
  .cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 16px; margin-bottom: 24px; }
  .card { background: #111114; border: 1px solid #1f1f23; border-radius: 12px; padding: 18px; }
  .card h3 { color: #fff; font-size: 16px; margin-bottom: 6px; display: flex; gap: 8px; align-items: center; }
  .muted { color: #71717a; font-size: 13px; }
  .badge { font-size: 12px; padding: 2px 8px; border-radius: 999px; background: #1f1f23; color: #a1a1aa; }
  .badge.ok, .status-COMPLETED { background: rgba(34,197,94,0.12); color: #4ade80; }
  .badge.down, .status-ERROR { background: rgba(239,68,68,0.12); color: #f87171; }
  .status-STARTING, .status-RUNNING { background: rgba(245,158,11,0.12); color: #fbbf24; }
  .steps { display: flex; flex-wrap: wrap; gap: 6px; margin-top: 12px; }
  .step { font-family: 'Cascadia Code', 'Fira Code', monospace; font-size: 12px; padding: 4px 8px; border-radius: 6px; background: #18181b; border: 1px solid #27272a; }
  .toolbar { display: flex; gap: 8px; align-items: center; margin-bottom: 16px; flex-wrap: wrap; }
  select, input { background: #111114; border: 1px solid #27272a; border-radius: 8px; padding: 10px 12px; color: #fff; font-size: 14px; outline: none; }
  select:focus, input:focus { border-color: #6366f1; }
  button, .button { background: #6366f1; color: #fff; border: none; border-radius: 8px; padding: 10px 18px; font-size: 14px; font-weight: 600; cursor: pointer; }
  button:hover, .button:hover { background: #4f46e5; }
  button:disabled { background: #27272a; cursor: not-allowed; }
  button.danger { background: #dc2626; }
  button.ghost { background: transparent; border: 1px solid #27272a; color: #a1a1aa; }
  .empty, .loading { border: 1px dashed #27272a; border-radius: 12px; padding: 48px; text-align: center; color: #71717a; }
  .canvas { position: relative; border: 1px solid #1f1f23; border-radius: 12px; overflow: hidden; background: #000; }
  .canvas img { display: block; width: 100%; cursor: crosshair; }
  .canvas .hint { position: absolute; left: 0; right: 0; bottom: 0; padding: 10px; text-align: center; background: rgba(245,158,11,0.15); color: #fbbf24; font-size: 13px; }
  .split { display: grid; grid-template-columns: 3fr 2fr; gap: 16px; }
  .screen { aspect-ratio: 16 / 9; border: 1px solid #1f1f23; border-radius: 12px; overflow: hidden; display: flex; align-items: center; justify-content: center; color: #52525b; }
  .screen iframe { width: 100%; height: 100%; border: none; }
  #log { background: #050507; border: 1px solid #1f1f23; border-radius: 12px; padding: 14px; height: 60vh; overflow-y: auto; font-family: 'Cascadia Code', 'Fira Code', monospace; font-size: 12px; line-height: 1.6; }
  #log .line { white-space: pre-wrap; }
  dialog { margin: auto; background: #111114; color: #e4e4e7; border: 1px solid #27272a; border-radius: 12px; padding: 20px; width: 380px; }
  dialog::backdrop { background: rgba(0,0,0,0.6); }
  dialog form { display: flex; flex-direction: column; gap: 10px; }
  .auth { max-width: 400px; margin: 10vh auto; }
  .auth form { display: flex; flex-direction: column; gap: 12px; }
  .tabs { display: flex; gap: 8px; margin-bottom: 8px; }
  .tabs a { flex: 1; text-align: center; padding: 8px; border-radius: 8px; background: #111114; color: #a1a1aa; }
  .tabs a.active { background: #1f1f23; color: #fff; }
  .notice { padding: 10px 12px; border-radius: 8px; font-size: 14px; }
  .notice.error { background: rgba(239,68,68,0.1); color: #fca5a5; }
  .notice.message { background: rgba(34,197,94,0.1); color: #86efac; }
"#;

fn document(title: &str, body: &str, script: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title} · IsoMind</title>
<style>{style}</style>
</head>
<body>
{body}
<script>{script}</script>
</body>
</html>
"#,
        title = text(title),
        style = STYLE,
        body = body,
        script = script,
    )
}

/// Sidebar layout shared by every page behind the session gate.
fn layout(title: &str, active: Nav, user: &CurrentUser, content: &str, script: &str) -> String {
    let links: String = NAVIGATION
        .iter()
        .map(|(nav, name, href)| {
            let class = if *nav == active { " class=\"active\"" } else { "" };
            format!(r#"<a href="{href}"{class}>{name}</a>"#)
        })
        .collect();

    let body = format!(
        r#"<div class="shell">
  <aside>
    <div class="brand">IsoMind</div>
    <nav>{links}</nav>
    <div class="account">
      <div>{email}</div>
      <form method="post" action="/auth/logout"><button class="ghost" type="submit">Disconnect</button></form>
    </div>
  </aside>
  <main>{content}</main>
</div>"#,
        email = text(user.display_name()),
    );
    document(title, &body, script)
}

pub fn login_page(mode: AuthMode, email: &str, notice: &Notice) -> String {
    let tabs = if mode == AuthMode::ForgotPassword {
        r#"<a href="/">Back to sign in</a>"#.to_string()
    } else {
        [AuthMode::Login, AuthMode::Signup]
            .iter()
            .map(|m| {
                let class = if *m == mode { " class=\"active\"" } else { "" };
                format!(r#"<a href="/?mode={}"{}>{}</a>"#, m.as_str(), class, m.submit_label())
            })
            .collect()
    };

    let password = if mode == AuthMode::ForgotPassword {
        String::new()
    } else {
        r#"<input type="password" name="password" required placeholder="Password">"#.to_string()
    };

    let forgot = if mode == AuthMode::Login {
        r#"<a class="muted" href="/?mode=forgot_password">Forgot password?</a>"#
    } else {
        ""
    };

    let notice = match notice {
        Notice::None => String::new(),
        Notice::Error(msg) => format!(r#"<div class="notice error">{}</div>"#, text(msg)),
        Notice::Message(msg) => format!(r#"<div class="notice message">{}</div>"#, text(msg)),
    };

    let body = format!(
        r#"<div class="auth card">
  <h1>IsoMind</h1>
  <p class="muted">{headline}</p>
  <div class="tabs">{tabs}</div>
  <form method="post" action="/auth">
    <input type="hidden" name="mode" value="{mode}">
    <input type="email" name="email" required placeholder="operator@isomind.ai" value="{email}">
    {password}
    {notice}
    <button type="submit">{submit}</button>
    {forgot}
  </form>
</div>"#,
        headline = mode.headline(),
        mode = mode.as_str(),
        email = attr(email),
        submit = mode.submit_label(),
    );
    document("Sign in", &body, "")
}

pub fn overview_page(user: &CurrentUser, health: Option<&OrchestratorHealth>) -> String {
    let status = match health {
        Some(h) if h.status == "ok" => {
            let idle = h
                .inactive_seconds
                .map(|s| format!("Idle for {:.0}s", s))
                .unwrap_or_default();
            format!(r#"<span class="badge ok">Online</span></h3><p class="muted">{}</p>"#, text(&idle))
        }
        Some(h) => format!(
            r#"<span class="badge down">{}</span></h3>"#,
            text(&h.status)
        ),
        None => r#"<span class="badge down">Offline</span></h3><p class="muted">The orchestrator did not answer its health check.</p>"#
            .to_string(),
    };

    let content = format!(
        r#"<h1>Agents</h1>
<p class="lead">Welcome to the visual AI orchestration platform. IsoMind teaches agents what UI elements look like,
so they can navigate the web from what is on screen instead of brittle HTML scraping.</p>
<div class="cards">
  <div class="card"><h3>1. Teach</h3><p class="muted">Go to the <b>Studio</b> tab. Capture a screenshot from a live agent and click on elements to record visual actions.</p></div>
  <div class="card"><h3>2. Review</h3><p class="muted">Your taught actions form a step-by-step workflow in the <b>Blueprints</b> tab.</p></div>
  <div class="card"><h3>3. Execute</h3><p class="muted">Trigger the workflow in the <b>Execution</b> tab and watch the agent replay it live.</p></div>
</div>
<div class="cards">
  <div class="card"><h3>Orchestrator {status}</div>
</div>"#
    );
    layout("Agents", Nav::Agents, user, &content, "")
}

const BLUEPRINTS_SCRIPT: &str = r#"
  const list = document.getElementById('blueprints');
  fetch('/dashboard/blueprints/list')
    .then(r => {
      if (r.redirected) { window.location.href = '/'; return ''; }
      return r.text();
    })
    .then(html => { list.innerHTML = html; })
    .catch(() => { list.innerHTML = '<div class="empty">No blueprints to show.</div>'; });
"#;

pub fn blueprints_page(user: &CurrentUser) -> String {
    let content = r#"<h1>Blueprints</h1>
<p class="lead">A Blueprint is a recorded workflow. It stores the sequence of actions and the <b>Visual Anchors</b> you taught the agent in the Studio.</p>
<div id="blueprints"><div class="loading">Loading blueprints...</div></div>"#;
    layout("Blueprints", Nav::Blueprints, user, content, BLUEPRINTS_SCRIPT)
}

/// The list fragment: an empty state, or one card per blueprint in the
/// order given.
pub fn blueprint_list(blueprints: &[Blueprint]) -> String {
    if blueprints.is_empty() {
        return r#"<div class="empty">You haven't created any workflows yet. Head over to the <b>Studio</b> tab to capture a screen and record your first visual action.</div>"#
            .to_string();
    }

    let cards: String = blueprints
        .iter()
        .map(|bp| {
            let steps = bp.steps();
            let mut preview: String = steps
                .iter()
                .take(STEP_PREVIEW_LIMIT)
                .map(|step| format!(r#"<span class="step">{}</span>"#, text(&step.caption())))
                .collect();
            if steps.len() > STEP_PREVIEW_LIMIT {
                preview.push_str(&format!(
                    r#"<span class="step muted">+{} more</span>"#,
                    steps.len() - STEP_PREVIEW_LIMIT
                ));
            }
            format!(
                r#"<div class="card blueprint">
  <h3>{name} <span class="badge">{count} steps</span></h3>
  <div class="muted">{id} · {date}</div>
  <div class="steps">{preview}</div>
  <div style="margin-top:12px"><a class="button" href="/dashboard/execution?blueprintId={id_attr}">Execute</a></div>
</div>"#,
                name = text(&bp.name),
                count = steps.len(),
                id = text(&bp.id),
                date = bp.created_date(),
                id_attr = attr(&query_escape(&bp.id)),
            )
        })
        .collect();

    format!(r#"<div class="cards">{cards}</div>"#)
}

fn blueprint_options(blueprints: &[BlueprintSummary], selected: Option<&str>, placeholder: &str) -> String {
    let mut options = format!(r#"<option value="">{}</option>"#, text(placeholder));
    for bp in blueprints {
        let chosen = if selected == Some(bp.id.as_str()) { " selected" } else { "" };
        options.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            attr(&bp.id),
            chosen,
            text(&bp.name)
        ));
    }
    options
}

const STUDIO_SCRIPT: &str = r#"
  const picker = document.getElementById('blueprint');
  const img = document.getElementById('screen');
  const placeholder = document.getElementById('placeholder');
  const hint = document.getElementById('hint');
  const captureBtn = document.getElementById('capture');
  const dialog = document.getElementById('teach');
  const form = document.getElementById('teach-form');
  const coords = document.getElementById('coords');
  let point = null;

  function syncHint() { hint.hidden = !!picker.value; }
  picker.addEventListener('change', syncHint);

  function showImage(src) {
    img.src = src;
    img.hidden = false;
    placeholder.hidden = true;
    syncHint();
  }

  async function capture() {
    captureBtn.disabled = true;
    captureBtn.textContent = 'Capturing...';
    try {
      const res = await fetch('/dashboard/studio/screenshot');
      const data = await res.json();
      if (res.ok) showImage(data.image); else alert(data.error);
    } catch (e) {
      alert('Failed to connect to Orchestrator API (Check backend logs)');
    }
    captureBtn.disabled = false;
    captureBtn.textContent = 'Capture State';
  }
  captureBtn.addEventListener('click', capture);

  document.getElementById('new-blueprint').addEventListener('click', async () => {
    const name = prompt('Enter a name for the new Blueprint:');
    if (!name) return;
    const res = await fetch('/dashboard/blueprints', {
      method: 'POST',
      headers: {'Content-Type': 'application/json'},
      body: JSON.stringify({name}),
    });
    if (!res.ok) return;
    const bp = await res.json();
    const opt = new Option(bp.name, bp.id);
    picker.insertBefore(opt, picker.options[1] || null);
    picker.value = bp.id;
    syncHint();
  });

  img.addEventListener('click', async e => {
    const r = img.getBoundingClientRect();
    const res = await fetch('/dashboard/studio/click', {
      method: 'POST',
      headers: {'Content-Type': 'application/json'},
      body: JSON.stringify({
        blueprint_id: picker.value || null,
        client_x: e.clientX,
        client_y: e.clientY,
        rect: {left: r.left, top: r.top, width: r.width, height: r.height},
      }),
    });
    const data = await res.json();
    if (!data.actionable) {
      hint.hidden = false;
      hint.animate([{opacity: 0.3}, {opacity: 1}], {duration: 400});
      return;
    }
    point = data.point;
    coords.textContent = '(' + point.x + ', ' + point.y + ') on 1920x1080';
    dialog.showModal();
  });

  form.action.addEventListener('change', () => {
    document.getElementById('type-text').hidden = form.action.value !== 'type';
  });

  document.getElementById('cancel').addEventListener('click', () => dialog.close());

  form.addEventListener('submit', async e => {
    e.preventDefault();
    if (!point || !picker.value) return;
    const submit = document.getElementById('submit-action');
    submit.disabled = true;
    try {
      const res = await fetch('/dashboard/studio/actions', {
        method: 'POST',
        headers: {'Content-Type': 'application/json'},
        body: JSON.stringify({
          blueprint_id: picker.value,
          action: form.action.value,
          label: form.label.value,
          x: point.x,
          y: point.y,
          text: form.text.value,
        }),
      });
      const data = await res.json();
      if (res.ok) {
        dialog.close();
        form.label.value = '';
        form.text.value = '';
        if (data.image) showImage(data.image);
      } else {
        alert(data.error);
      }
    } catch (err) {
      alert('Failed to connect to Orchestrator API');
    }
    submit.disabled = false;
  });
"#;

pub fn studio_page(user: &CurrentUser, blueprints: &[BlueprintSummary]) -> String {
    let content = format!(
        r#"<h1>Studio</h1>
<p class="lead">Teach the agent how to navigate. First, select or create a Blueprint.
Then, click <b>Capture State</b> to view the remote browser. Click directly on the image to record a visual action.</p>
<div class="toolbar">
  <select id="blueprint">{options}</select>
  <button id="new-blueprint" class="ghost" title="Create New Blueprint">+ New</button>
  <button id="capture">Capture State</button>
</div>
<div class="canvas">
  <div id="placeholder" class="empty">No screen captured yet.</div>
  <img id="screen" alt="Agent Screen" hidden>
  <div id="hint" class="hint" hidden>⚠ Select or Create a Blueprint first to record actions.</div>
</div>
<dialog id="teach">
  <form id="teach-form">
    <h3>Record action</h3>
    <div class="muted" id="coords"></div>
    <select name="action"><option value="click">Click</option><option value="type">Type</option></select>
    <input name="label" required placeholder="What is this element? e.g. Search button">
    <input id="type-text" name="text" placeholder="Text to type" hidden>
    <div class="toolbar">
      <button type="submit" id="submit-action">Save Action</button>
      <button type="button" class="ghost" id="cancel">Cancel</button>
    </div>
  </form>
</dialog>"#,
        options = blueprint_options(blueprints, None, "Select Blueprint to Edit..."),
    );
    layout("Studio", Nav::Studio, user, &content, STUDIO_SCRIPT)
}

const EXECUTION_SCRIPT: &str = r#"
  const picker = document.getElementById('blueprint');
  const startUrl = document.getElementById('start-url');
  const startBtn = document.getElementById('start');
  const abortBtn = document.getElementById('abort');
  const badge = document.getElementById('status');
  const log = document.getElementById('log');
  const screen = document.getElementById('screen');
  let status = 'IDLE';
  let runId = null;
  let events = null;

  function append(line) {
    const div = document.createElement('div');
    div.className = 'line';
    div.textContent = line;
    log.appendChild(div);
    log.scrollTop = log.scrollHeight;
  }

  function setStatus(next) {
    status = next;
    badge.textContent = next;
    badge.className = 'badge status-' + next;
    const active = next === 'STARTING' || next === 'RUNNING';
    startBtn.hidden = active;
    abortBtn.hidden = !active;
    picker.disabled = active;
    startBtn.disabled = !picker.value;
    if (next === 'IDLE') {
      screen.innerHTML = '<p>Awaiting Execution Command</p>';
    } else if (!screen.querySelector('iframe')) {
      screen.innerHTML = '<iframe src="/api/proxy/vnc" title="Agent Live VNC Stream"></iframe>';
    }
    if (!active && events) { events.close(); events = null; }
  }

  picker.addEventListener('change', () => { startBtn.disabled = !picker.value; });

  startBtn.addEventListener('click', async () => {
    if (!picker.value) return;
    log.innerHTML = '';
    try {
      const res = await fetch('/dashboard/execution/runs', {
        method: 'POST',
        headers: {'Content-Type': 'application/json'},
        body: JSON.stringify({blueprint_id: picker.value, start_url: startUrl.value}),
      });
      const data = await res.json();
      if (!res.ok) throw new Error(data.error || res.statusText);
      runId = data.run_id;
    } catch (e) {
      setStatus('ERROR');
      append('[ERROR] Failed to connect to API: ' + e.message);
      return;
    }
    events = new EventSource('/dashboard/execution/runs/' + runId + '/events');
    // Every connection starts with a full replay.
    events.onopen = () => { log.innerHTML = ''; };
    events.addEventListener('status', e => setStatus(JSON.parse(e.data)));
    events.addEventListener('log', e => append(JSON.parse(e.data)));
  });

  abortBtn.addEventListener('click', async () => {
    if (events) { events.close(); events = null; }
    setStatus('IDLE');
    append('[SYSTEM] Execution aborted by operator.');
    if (runId) await fetch('/dashboard/execution/runs/' + runId + '/abort', {method: 'POST'});
  });

  setStatus('IDLE');
"#;

pub fn execution_page(
    user: &CurrentUser,
    blueprints: &[BlueprintSummary],
    selected: Option<&str>,
    start_url: &str,
    banner: &[String],
) -> String {
    let lines: String = banner
        .iter()
        .map(|line| format!(r#"<div class="line">{}</div>"#, text(line)))
        .collect();

    let content = format!(
        r#"<h1>Execution</h1>
<p class="lead">Select a Blueprint and press Start. The agent compares your recorded Visual Anchors against the live screen
and clicks the best matches on its own.</p>
<div class="toolbar">
  <select id="blueprint">{options}</select>
  <input id="start-url" type="url" value="{start_url}" placeholder="Start URL">
  <button id="start">Start Task</button>
  <button id="abort" class="danger" hidden>Abort Forcefully</button>
  <span id="status" class="badge">IDLE</span>
</div>
<div class="split">
  <div id="screen" class="screen"><p>Awaiting Execution Command</p></div>
  <div id="log">{lines}</div>
</div>"#,
        options = blueprint_options(blueprints, selected, "Select a Blueprint..."),
        start_url = attr(start_url),
    );
    layout("Execution", Nav::Execution, user, &content, EXECUTION_SCRIPT)
}

/// Percent-encodes an id for use in a query string.
fn query_escape(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::User;
    use crate::types::{ActionKind, StateGraph, Step};

    fn operator() -> CurrentUser {
        CurrentUser {
            user: User {
                id: "u-1".to_string(),
                email: Some("ops@example.com".to_string()),
            },
            access_token: "token".to_string(),
        }
    }

    fn blueprint(name: &str, steps: usize) -> Blueprint {
        Blueprint {
            id: "bp 1".to_string(),
            name: name.to_string(),
            created_at: None,
            state_graph_json: Some(StateGraph {
                steps: (0..steps)
                    .map(|i| Step {
                        step: Some(i as u32 + 1),
                        action: ActionKind::Click,
                        semantic_target: Some(format!("Target {}", i + 1)),
                        text: None,
                    })
                    .collect(),
            }),
        }
    }

    #[test]
    fn empty_list_renders_empty_state() {
        let html = blueprint_list(&[]);
        assert!(html.contains("class=\"empty\""));
        assert!(!html.contains("Loading"));
    }

    #[test]
    fn loading_shell_is_distinct_from_empty_state() {
        let html = blueprints_page(&operator());
        assert!(html.contains("Loading blueprints..."));
        assert!(!html.contains("You haven't created any workflows yet"));
    }

    #[test]
    fn long_blueprints_show_five_steps_and_remainder() {
        let html = blueprint_list(&[blueprint("<Checkout>", 7)]);
        assert!(html.contains("&lt;Checkout&gt;"));
        assert!(html.contains("7 steps"));
        assert!(html.contains("CLICK: Target 5"));
        assert!(!html.contains("CLICK: Target 6"));
        assert!(html.contains("+2 more"));
        assert!(html.contains("/dashboard/execution?blueprintId=bp%201"));
    }

    #[test]
    fn login_errors_are_inline_and_escaped() {
        let html = login_page(AuthMode::Login, "a@b.c", &Notice::Error("<bad>".to_string()));
        assert!(html.contains(r#"<div class="notice error">&lt;bad&gt;</div>"#));
        assert!(html.contains("Sign in to orchestrate your agents."));
        assert!(html.contains(r#"value="a@b.c""#));
    }

    #[test]
    fn forgot_password_form_has_no_password_field() {
        let html = login_page(AuthMode::ForgotPassword, "", &Notice::None);
        assert!(!html.contains("name=\"password\""));
        assert!(html.contains("Reset your password."));
    }

    #[test]
    fn execution_page_preselects_and_seeds_banner() {
        let pickers = vec![
            BlueprintSummary { id: "a".to_string(), name: "First".to_string() },
            BlueprintSummary { id: "b".to_string(), name: "Second".to_string() },
        ];
        let html = execution_page(
            &operator(),
            &pickers,
            Some("b"),
            "https://example.com",
            &["[SYSTEM] Environment: development".to_string()],
        );
        assert!(html.contains(r#"<option value="b" selected>Second</option>"#));
        assert!(html.contains(r#"<option value="a">First</option>"#));
        assert!(html.contains("[SYSTEM] Environment: development"));
        assert!(html.contains("ops@example.com"));
    }

    #[test]
    fn mode_parsing_defaults_to_login() {
        assert_eq!(AuthMode::parse(None), AuthMode::Login);
        assert_eq!(AuthMode::parse(Some("signup")), AuthMode::Signup);
        assert_eq!(AuthMode::parse(Some("nonsense")), AuthMode::Login);
    }
}
