use crate::view_state::{ViewChange, ViewMode, ViewState};
use crate::{
    Catalog, CategoryCode, Difficulty, Entry, GlossaryTerm, Listing, ListingConfig, SortKey,
    SortOrder, Template, evaluate,
};
use askama::Template as HtmlTemplate;
use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use markdown::{Options as MarkdownOptions, to_html_with_options};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, info};

type SharedState = Arc<AppState>;
const RELATED_LIMIT: usize = 3;
const SUGGESTION_LIMIT: usize = 5;

#[derive(Clone)]
pub struct AppState {
    pub base_url: String,
    pub listing: ListingConfig,
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub base_url: String,
    pub listing: ListingConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            base_url: "http://127.0.0.1:8080".to_string(),
            listing: ListingConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        base_url: config.base_url.clone(),
        listing: config.listing,
    });
    let router = build_router(state);
    info!(
        addr = %config.addr,
        base = %config.base_url,
        per_page = config.listing.items_per_page,
        templates = crate::templates().len(),
        terms = crate::glossary().len(),
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/templates", get(templates_html))
        .route("/templates/:id", get(template_html))
        .route("/glossary", get(glossary_html))
        .route("/glossary/:id", get(term_html))
        .route("/api/templates", get(api_templates))
        .route("/api/templates/:id", get(api_template))
        .route("/api/glossary", get(api_glossary))
        .route("/api/glossary/:id", get(api_term))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "guide-site-web" }))
}

/// Static description of one listing surface.
struct Surface {
    path: &'static str,
    title: &'static str,
    eyebrow: &'static str,
}

const TEMPLATE_SURFACE: Surface = Surface {
    path: "/templates",
    title: "投稿テンプレート集",
    eyebrow: "Templates",
};

const GLOSSARY_SURFACE: Surface = Surface {
    path: "/glossary",
    title: "用語集",
    eyebrow: "Glossary",
};

async fn home() -> impl IntoResponse {
    let template = HomeTemplate {
        version: env!("CARGO_PKG_VERSION"),
        template_count: crate::templates().len(),
        term_count: crate::glossary().len(),
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(err.to_string())),
    )
}

async fn templates_html(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let catalog = crate::templates();
    let listing = evaluate(catalog, query.as_deref().unwrap_or_default(), &state.listing);
    let payload = build_listing_payload(&TEMPLATE_SURFACE, catalog, &listing, template_badge);
    render_listing(&state, &TEMPLATE_SURFACE, payload)
}

async fn glossary_html(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let catalog = crate::glossary();
    let listing = evaluate(catalog, query.as_deref().unwrap_or_default(), &state.listing);
    let payload = build_listing_payload(&GLOSSARY_SURFACE, catalog, &listing, term_badge);
    render_listing(&state, &GLOSSARY_SURFACE, payload)
}

fn render_listing(state: &AppState, surface: &Surface, payload: ListingPagePayload) -> Html<String> {
    let template = ListingTemplate {
        title: surface.title,
        eyebrow: surface.eyebrow,
        canonical_url: format!("{}{}", state.base_url, payload.canonical_href),
        payload: &payload,
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(err.to_string())),
    )
}

async fn template_html(Path(id): Path<String>) -> Response {
    let catalog = crate::templates();
    let Some(entry) = catalog.get_by_id(&id) else {
        return not_found_page(catalog, &TEMPLATE_SURFACE, &id);
    };
    let back_href = ViewState::default()
        .apply(ViewChange::ToggleCategory(entry.category))
        .href(TEMPLATE_SURFACE.path);
    let template = TemplateDetailTemplate {
        entry,
        category_label: entry.category.label(),
        difficulty_label: entry.difficulty.label(),
        engagement_score: entry.engagement.score(),
        description_html: render_markdown_str(&entry.description).unwrap_or_default(),
        related: related_rows(catalog, &TEMPLATE_SURFACE, &entry.id, template_badge),
        back_href,
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(err.to_string())),
    )
    .into_response()
}

async fn term_html(Path(id): Path<String>) -> Response {
    let catalog = crate::glossary();
    let Some(entry) = catalog.get_by_id(&id) else {
        return not_found_page(catalog, &GLOSSARY_SURFACE, &id);
    };
    let back_href = ViewState::default()
        .apply(ViewChange::ToggleCategory(entry.category))
        .href(GLOSSARY_SURFACE.path);
    let template = TermDetailTemplate {
        entry,
        category_label: entry.category.label(),
        description_html: render_markdown_str(&entry.description).unwrap_or_default(),
        related: related_rows(catalog, &GLOSSARY_SURFACE, &entry.id, term_badge),
        back_href,
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(err.to_string())),
    )
    .into_response()
}

fn not_found_page<E: Entry>(catalog: &Catalog<E>, surface: &Surface, id: &str) -> Response {
    debug!(id, path = surface.path, "lookup miss");
    let prefix: String = id.chars().take(3).collect();
    let suggestions = catalog.suggest_ids(&prefix, SUGGESTION_LIMIT);
    let mut message = format!("「{id}」は見つかりませんでした。");
    if !suggestions.is_empty() {
        message.push_str(&format!(" 候補: {}", suggestions.join(", ")));
    }
    (StatusCode::NOT_FOUND, Html(render_error_page(message))).into_response()
}

async fn api_templates(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let listing = evaluate(
        crate::templates(),
        query.as_deref().unwrap_or_default(),
        &state.listing,
    );
    Json(listing_json(&listing))
}

async fn api_glossary(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let listing = evaluate(
        crate::glossary(),
        query.as_deref().unwrap_or_default(),
        &state.listing,
    );
    Json(listing_json(&listing))
}

async fn api_template(Path(id): Path<String>) -> Result<Json<Template>, ApiError> {
    crate::templates()
        .get_by_id(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No template found for id {id:?}")))
}

async fn api_term(Path(id): Path<String>) -> Result<Json<GlossaryTerm>, ApiError> {
    crate::glossary()
        .get_by_id(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No glossary term found for id {id:?}")))
}

fn listing_json<E: Entry + Serialize>(listing: &Listing<'_, E>) -> serde_json::Value {
    json!({
        "query": listing.state.to_query(),
        "state": listing.state,
        "page": listing.page.info,
        "catalog_size": listing.catalog_size,
        "empty": listing.is_empty(),
        "results": listing.page.items,
    })
}

#[derive(Debug, Clone)]
struct LinkOption {
    label: String,
    href: String,
    active: bool,
    count: usize,
    show_count: bool,
}

impl LinkOption {
    fn new(label: impl Into<String>, href: String, active: bool) -> Self {
        Self {
            label: label.into(),
            href,
            active,
            count: 0,
            show_count: false,
        }
    }

    fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self.show_count = true;
        self
    }
}

#[derive(Debug, Clone)]
struct EntryRow {
    href: String,
    title: String,
    category_label: &'static str,
    description: String,
    badge: String,
}

#[derive(Debug, Clone)]
struct ListingPagePayload {
    canonical_href: String,
    search: String,
    hidden_fields: Vec<(&'static str, String)>,
    category_chips: Vec<LinkOption>,
    difficulty_options: Vec<LinkOption>,
    sort_options: Vec<LinkOption>,
    order_toggle: LinkOption,
    view_options: Vec<LinkOption>,
    reset_href: String,
    has_filters: bool,
    rows: Vec<EntryRow>,
    card_view: bool,
    empty: bool,
    summary: String,
    page_links: Vec<LinkOption>,
    previous_href: String,
    next_href: String,
}

fn entry_row<E: Entry>(surface: &Surface, entry: &E, badge: fn(&E) -> String) -> EntryRow {
    EntryRow {
        href: format!("{}/{}", surface.path, entry.id()),
        title: entry.title().to_string(),
        category_label: entry.category().label(),
        description: entry.description().to_string(),
        badge: badge(entry),
    }
}

fn template_badge(template: &Template) -> String {
    format!(
        "{} • エンゲージメント {}",
        template.difficulty.label(),
        template.engagement.score()
    )
}

fn term_badge(term: &GlossaryTerm) -> String {
    term.english.clone().unwrap_or_default()
}

fn related_rows<E: Entry>(
    catalog: &Catalog<E>,
    surface: &Surface,
    id: &str,
    badge: fn(&E) -> String,
) -> Vec<EntryRow> {
    catalog
        .get_related(id, RELATED_LIMIT)
        .into_iter()
        .map(|entry| entry_row(surface, entry, badge))
        .collect()
}

/// Every link on a listing page is the current state with one change applied.
fn build_listing_payload<E: Entry>(
    surface: &Surface,
    catalog: &Catalog<E>,
    listing: &Listing<'_, E>,
    badge: fn(&E) -> String,
) -> ListingPagePayload {
    let info = listing.page.info;
    let served = listing.state.apply(ViewChange::SetPage(info.current_page));
    let state = &served;
    let link = |change: ViewChange<E::Category>| state.apply(change).href(surface.path);

    let mut category_chips = vec![LinkOption::new(
        "すべて",
        link(ViewChange::ClearCategories),
        state.categories.is_empty(),
    )
    .with_count(catalog.len())];
    category_chips.extend(catalog.category_counts().into_iter().map(|(category, count)| {
        LinkOption::new(
            category.label(),
            link(ViewChange::ToggleCategory(category)),
            state.categories.contains(&category),
        )
        .with_count(count)
    }));

    let difficulty_options = if E::Category::FILTERS_DIFFICULTY {
        let mut options = vec![LinkOption::new(
            "すべての難易度",
            link(ViewChange::SetDifficulty(None)),
            state.difficulty.is_none(),
        )];
        options.extend(Difficulty::ALL.into_iter().map(|difficulty| {
            LinkOption::new(
                difficulty.label(),
                link(ViewChange::SetDifficulty(Some(difficulty))),
                state.difficulty == Some(difficulty),
            )
        }));
        options
    } else {
        Vec::new()
    };

    let sort_options = std::iter::once(SortKey::Default)
        .chain(E::Category::SORT_KEYS.iter().copied())
        .map(|key| {
            LinkOption::new(
                key.label(),
                link(ViewChange::SetSort(key)),
                state.sort_by == key,
            )
        })
        .collect();
    let order_label = match state.sort_order {
        SortOrder::Asc => "昇順",
        SortOrder::Desc => "降順",
    };
    let order_toggle = LinkOption::new(order_label, link(ViewChange::ToggleSortOrder), false);

    let view_options = [(ViewMode::Card, "カード"), (ViewMode::List, "リスト")]
        .into_iter()
        .map(|(mode, label)| {
            LinkOption::new(label, link(ViewChange::SetViewMode(mode)), state.view == mode)
        })
        .collect();

    let page_links = (1..=info.total_pages)
        .map(|page| {
            LinkOption::new(
                page.to_string(),
                link(ViewChange::SetPage(page)),
                page == info.current_page,
            )
        })
        .collect();
    let previous_href = if info.has_previous() {
        link(ViewChange::SetPage(info.current_page - 1))
    } else {
        String::new()
    };
    let next_href = if info.has_next() {
        link(ViewChange::SetPage(info.current_page + 1))
    } else {
        String::new()
    };

    let hidden_fields = state
        .apply(ViewChange::SetSearch(String::new()))
        .to_pairs();

    let summary = if listing.is_empty() {
        format!("{}件中、条件に一致する項目はありません", listing.catalog_size)
    } else {
        format!(
            "{}件中 {}–{}件を表示（{}/{}ページ）",
            info.total_items,
            info.first_item(),
            info.last_item(),
            info.current_page,
            info.total_pages
        )
    };

    ListingPagePayload {
        canonical_href: state.href(surface.path),
        search: state.search.clone(),
        hidden_fields,
        category_chips,
        difficulty_options,
        sort_options,
        order_toggle,
        view_options,
        reset_href: link(ViewChange::ResetFilters),
        has_filters: state.has_filters(),
        rows: listing
            .page
            .items
            .iter()
            .map(|entry| entry_row(surface, *entry, badge))
            .collect(),
        card_view: state.view == ViewMode::Card,
        empty: listing.is_empty(),
        summary,
        page_links,
        previous_href,
        next_href,
    }
}

fn render_error_page(message: impl Into<String>) -> String {
    let template = ErrorTemplate {
        message: message.into(),
    };
    template
        .render()
        .unwrap_or_else(|_| "<!DOCTYPE html><title>Error</title><p>Something went wrong</p>".to_string())
}

fn render_markdown_str(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let options = MarkdownOptions::gfm();
    let html = to_html_with_options(trimmed, &options).unwrap_or_else(|_| trimmed.to_string());
    Some(html)
}

#[derive(HtmlTemplate)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="ja">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>アルゴリズム攻略ガイド</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="min-h-screen flex flex-col items-center justify-start py-10 px-4">
      <div class="max-w-5xl w-full space-y-6">
        <p class="uppercase tracking-wide text-sm text-slate-500">guide-site v{{ version }}</p>
        <h1 class="text-4xl font-extrabold tracking-tight">おすすめアルゴリズムの仕組みを学ぶ</h1>
        <div class="flex flex-wrap gap-3">
          <a href="/templates" class="inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow">投稿テンプレート（{{ template_count }}件）</a>
          <a href="/glossary" class="inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow">用語集（{{ term_count }}語）</a>
        </div>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct HomeTemplate {
    version: &'static str,
    template_count: usize,
    term_count: usize,
}

#[derive(HtmlTemplate)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="ja">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ title }}</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    <link rel="canonical" href="{{ canonical_url }}">
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="min-h-screen flex flex-col items-center justify-start py-10 px-4">
      <div class="max-w-5xl w-full space-y-6">
        <div>
          <p class="uppercase tracking-wide text-sm text-slate-500">{{ eyebrow }}</p>
          <h1 class="text-4xl font-extrabold tracking-tight">{{ title }}</h1>
        </div>

        <form method="get" class="flex gap-2">
          <input type="search" name="search" value="{{ payload.search }}" placeholder="キーワードで検索" class="flex-1 rounded border px-3 py-2">
          {% for (name, value) in payload.hidden_fields %}
          <input type="hidden" name="{{ name }}" value="{{ value }}">
          {% endfor %}
          <button type="submit" class="rounded-md bg-slate-900 px-4 py-2 text-white font-semibold">検索</button>
        </form>

        <nav class="flex flex-wrap gap-2" aria-label="カテゴリ">
          {% for chip in payload.category_chips %}
          <a href="{{ chip.href }}" class="px-3 py-1 rounded-full border {% if chip.active %}bg-slate-900 text-white{% else %}bg-white{% endif %}">{{ chip.label }}{% if chip.show_count %} <span class="text-xs">({{ chip.count }})</span>{% endif %}</a>
          {% endfor %}
        </nav>

        {% if payload.difficulty_options.len() > 0 %}
        <nav class="flex flex-wrap gap-2 text-sm" aria-label="難易度">
          {% for option in payload.difficulty_options %}
          <a href="{{ option.href }}" class="px-3 py-1 rounded {% if option.active %}bg-slate-700 text-white{% else %}bg-slate-200{% endif %}">{{ option.label }}</a>
          {% endfor %}
        </nav>
        {% endif %}

        <div class="flex flex-wrap items-center gap-2 text-sm">
          <span class="text-slate-500">並び替え:</span>
          {% for option in payload.sort_options %}
          <a href="{{ option.href }}" class="px-2 py-1 rounded {% if option.active %}font-bold underline{% endif %}">{{ option.label }}</a>
          {% endfor %}
          <a href="{{ payload.order_toggle.href }}" class="px-2 py-1 rounded border">{{ payload.order_toggle.label }}</a>
          <span class="ml-auto text-slate-500">表示:</span>
          {% for option in payload.view_options %}
          <a href="{{ option.href }}" class="px-2 py-1 rounded {% if option.active %}font-bold underline{% endif %}">{{ option.label }}</a>
          {% endfor %}
          {% if payload.has_filters %}
          <a href="{{ payload.reset_href }}" class="px-2 py-1 rounded text-red-700">条件をクリア</a>
          {% endif %}
        </div>

        <p class="text-sm text-slate-500">{{ payload.summary }}</p>

        {% if payload.empty %}
        <section id="no-results" class="bg-white shadow rounded p-6 text-center">
          <p class="font-semibold">条件に一致する項目はありません。</p>
          <a href="{{ payload.reset_href }}" class="text-blue-700 hover:underline">条件をクリアする</a>
        </section>
        {% else if payload.card_view %}
        <section id="results" class="grid gap-4 md:grid-cols-2">
          {% for row in payload.rows %}
          <a href="{{ row.href }}" class="block bg-white shadow rounded p-4 hover:shadow-md">
            <p class="text-xs text-slate-500">{{ row.category_label }}</p>
            <h2 class="text-lg font-semibold">{{ row.title }}</h2>
            <p class="text-sm text-slate-600">{{ row.description }}</p>
            {% if row.badge.len() > 0 %}<p class="text-xs text-slate-500 mt-2">{{ row.badge }}</p>{% endif %}
          </a>
          {% endfor %}
        </section>
        {% else %}
        <section id="results" class="bg-white shadow rounded overflow-hidden">
          <table class="min-w-full">
            <tbody>
              {% for row in payload.rows %}
              <tr class="border-b border-slate-200">
                <td class="px-4 py-2 text-xs text-slate-500">{{ row.category_label }}</td>
                <td class="px-4 py-2"><a href="{{ row.href }}" class="text-blue-700 hover:underline">{{ row.title }}</a></td>
                <td class="px-4 py-2 text-sm text-slate-600">{{ row.description }}</td>
                <td class="px-4 py-2 text-xs text-slate-500">{{ row.badge }}</td>
              </tr>
              {% endfor %}
            </tbody>
          </table>
        </section>
        {% endif %}

        {% if payload.page_links.len() > 1 %}
        <nav class="flex flex-wrap gap-2 justify-center" aria-label="ページ">
          {% if payload.previous_href.len() > 0 %}
          <a href="{{ payload.previous_href }}" class="px-3 py-1 rounded border" rel="prev">前へ</a>
          {% endif %}
          {% for option in payload.page_links %}
          <a href="{{ option.href }}" class="px-3 py-1 rounded border {% if option.active %}bg-slate-900 text-white{% endif %}">{{ option.label }}</a>
          {% endfor %}
          {% if payload.next_href.len() > 0 %}
          <a href="{{ payload.next_href }}" class="px-3 py-1 rounded border" rel="next">次へ</a>
          {% endif %}
        </nav>
        {% endif %}
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct ListingTemplate<'a> {
    title: &'a str,
    eyebrow: &'a str,
    canonical_url: String,
    payload: &'a ListingPagePayload,
}

#[derive(HtmlTemplate)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="ja">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ entry.title }} • 投稿テンプレート</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="min-h-screen flex flex-col items-center justify-start py-10 px-4">
      <article class="max-w-3xl w-full space-y-6">
        <a href="{{ back_href }}" class="text-sm text-blue-700 hover:underline">← {{ category_label }}のテンプレート一覧</a>
        <div>
          <p class="uppercase tracking-wide text-sm text-slate-500">{{ category_label }} • {{ difficulty_label }}</p>
          <h1 class="text-3xl font-extrabold tracking-tight">{{ entry.title }}</h1>
        </div>
        <div class="prose prose-slate max-w-none">{{ description_html|safe }}</div>
        <section id="template-body">
          <h2 class="text-xl font-semibold mb-2">テンプレート</h2>
          <pre class="bg-white shadow rounded p-4 whitespace-pre-wrap">{{ entry.body }}</pre>
        </section>
        {% if entry.effects.len() > 0 %}
        <section id="effects">
          <h2 class="text-xl font-semibold mb-2">期待できる効果</h2>
          <ul class="list-disc pl-6">
            {% for effect in entry.effects %}
            <li>{{ effect }}</li>
            {% endfor %}
          </ul>
        </section>
        {% endif %}
        <section id="engagement" class="text-sm text-slate-600">
          いいね {{ entry.engagement.likes.code() }} / リプライ {{ entry.engagement.replies.code() }} / リポスト {{ entry.engagement.reposts.code() }}（スコア {{ engagement_score }}）
        </section>
        {% if related.len() > 0 %}
        <section id="related">
          <h2 class="text-xl font-semibold mb-2">関連テンプレート</h2>
          <ul class="space-y-2">
            {% for row in related %}
            <li><a href="{{ row.href }}" class="text-blue-700 hover:underline">{{ row.title }}</a> <span class="text-xs text-slate-500">{{ row.category_label }}</span></li>
            {% endfor %}
          </ul>
        </section>
        {% endif %}
      </article>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct TemplateDetailTemplate<'a> {
    entry: &'a Template,
    category_label: &'static str,
    difficulty_label: &'static str,
    engagement_score: u32,
    description_html: String,
    related: Vec<EntryRow>,
    back_href: String,
}

#[derive(HtmlTemplate)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="ja">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ entry.term }} • 用語集</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="min-h-screen flex flex-col items-center justify-start py-10 px-4">
      <article class="max-w-3xl w-full space-y-6">
        <a href="{{ back_href }}" class="text-sm text-blue-700 hover:underline">← {{ category_label }}の用語一覧</a>
        <div>
          <p class="uppercase tracking-wide text-sm text-slate-500">{{ category_label }}</p>
          <h1 class="text-3xl font-extrabold tracking-tight">{{ entry.term }}</h1>
          {% if entry.english.is_some() %}
          <p class="text-lg text-slate-600">{{ entry.english.as_ref().unwrap() }}</p>
          {% endif %}
        </div>
        <p class="text-lg">{{ entry.short_description }}</p>
        <section id="description" class="prose prose-slate max-w-none">{{ description_html|safe }}</section>
        {% if related.len() > 0 %}
        <section id="related">
          <h2 class="text-xl font-semibold mb-2">関連用語</h2>
          <ul class="space-y-2">
            {% for row in related %}
            <li><a href="{{ row.href }}" class="text-blue-700 hover:underline">{{ row.title }}</a> <span class="text-xs text-slate-500">{{ row.badge }}</span></li>
            {% endfor %}
          </ul>
        </section>
        {% endif %}
      </article>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct TermDetailTemplate<'a> {
    entry: &'a GlossaryTerm,
    category_label: &'static str,
    description_html: String,
    related: Vec<EntryRow>,
    back_href: String,
}

#[derive(HtmlTemplate)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="ja">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>エラー</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="min-h-screen flex flex-col items-center justify-start py-10 px-4">
      <div class="max-w-3xl w-full space-y-4">
        <h1 class="text-3xl font-extrabold">ページが見つかりません</h1>
        <p class="text-lg text-slate-600">{{ message }}</p>
        <a href="/" class="inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold">トップへ戻る</a>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct ErrorTemplate {
    message: String,
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let state = Arc::new(AppState {
            base_url: "http://127.0.0.1:8080".to_string(),
            listing: ListingConfig::default(),
        });
        build_router(state)
    }

    async fn get_response(uri: &str) -> (StatusCode, String) {
        let response = test_router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get_response("/healthz").await;
        assert!(status.is_success());
        assert!(body.contains("\"ok\""));
    }

    #[tokio::test]
    async fn api_listing_applies_category_filter() {
        let (status, body) = get_response("/api/templates?category=viral,thread").await;
        assert!(status.is_success());
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["query"], "category=viral,thread");
        let results = payload["results"].as_array().unwrap();
        let expected = crate::templates()
            .get_all()
            .iter()
            .filter(|t| matches!(t.category.code(), "viral" | "thread"))
            .count();
        assert_eq!(results.len(), expected);
        assert!(
            results
                .iter()
                .all(|t| t["category"] == "viral" || t["category"] == "thread")
        );
    }

    #[tokio::test]
    async fn api_listing_clamps_stale_pages() {
        let (status, body) = get_response("/api/templates?page=99").await;
        assert!(status.is_success());
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["page"]["current_page"], payload["page"]["total_pages"]);
        assert!(!payload["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_lookup_miss_is_404() {
        let (status, body) = get_response("/api/templates/does-not-exist").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("error"));
        let (status, _) = get_response("/api/glossary/heavy-ranker").await;
        assert!(status.is_success());
    }

    #[tokio::test]
    async fn listing_page_renders_empty_state() {
        let (status, body) = get_response("/templates?search=zzzz-no-such-text").await;
        assert!(status.is_success());
        assert!(body.contains("id=\"no-results\""));
    }

    #[tokio::test]
    async fn listing_page_links_reset_the_page() {
        let (status, body) = get_response("/templates?page=2").await;
        assert!(status.is_success());
        assert!(body.contains("templates?category=viral\""));
        assert!(!body.contains("category=viral&amp;page=2"));
        assert!(body.contains("id=\"results\""));
    }

    #[tokio::test]
    async fn stale_page_links_point_at_the_served_page() {
        let (status, body) = get_response("/templates?page=99").await;
        assert!(status.is_success());
        assert!(!body.contains("page=99"));
        assert!(body.contains("templates?page=2"));

        let catalog = crate::templates();
        let listing = evaluate(catalog, "page=99", &ListingConfig::default());
        let payload = build_listing_payload(&TEMPLATE_SURFACE, catalog, &listing, template_badge);
        assert_eq!(payload.canonical_href, "/templates?page=2");
        assert_eq!(payload.view_options[1].href, "/templates?page=2&view=list");
        assert!(payload.page_links[1].active);
        assert_eq!(payload.previous_href, "/templates");
        assert!(payload.next_href.is_empty());
    }

    #[tokio::test]
    async fn glossary_search_accepts_encoded_text() {
        let (status, body) = get_response(
            "/glossary?search=%E3%83%AA%E3%83%97%E3%83%A9%E3%82%A4&view=list",
        )
        .await;
        assert!(status.is_success());
        assert!(body.contains("reply-engagement\""));
        assert!(body.contains("<table"));
    }

    #[tokio::test]
    async fn detail_pages_render_and_miss() {
        let (status, body) = get_response("/templates/thread-deep-dive").await;
        assert!(status.is_success());
        assert!(body.contains("id=\"template-body\""));
        let (status, body) = get_response("/glossary/heavy-rank").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("heavy-ranker"));
    }

    #[test]
    fn render_markdown_str_skips_blank_input() {
        assert!(render_markdown_str("   ").is_none());
        let html = render_markdown_str("**重要**").expect("rendered");
        assert!(html.contains("<strong>重要</strong>"));
    }
}
