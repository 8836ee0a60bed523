//! Source descriptors: everything that distinguishes one job board from
//! another, expressed as data.
//!
//! The harvest pipeline is generic; a [`SourceDescriptor`] supplies the URL
//! template, pagination arithmetic, fixed page range, selector layout,
//! persistence mode, query policy and proxy tier for one [`SourceKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::AppError;
use crate::layout::{Accessor, Field, FieldRule, Layout, Transform};
use crate::models::{PersistenceMode, SearchQuery};

/// One of the supported job boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    LinkedIn,
    Indeed,
    Glassdoor,
    StepStone,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::LinkedIn,
        SourceKind::Indeed,
        SourceKind::Glassdoor,
        SourceKind::StepStone,
    ];

    /// Lowercase identifier used in URL paths, env vars and the database.
    pub fn slug(&self) -> &'static str {
        match self {
            SourceKind::LinkedIn => "linkedin",
            SourceKind::Indeed => "indeed",
            SourceKind::Glassdoor => "glassdoor",
            SourceKind::StepStone => "stepstone",
        }
    }

    pub fn descriptor(&self) -> &'static SourceDescriptor {
        match self {
            SourceKind::LinkedIn => &LINKEDIN,
            SourceKind::Indeed => &INDEED,
            SourceKind::Glassdoor => &GLASSDOOR,
            SourceKind::StepStone => &STEPSTONE,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linkedin" => Ok(SourceKind::LinkedIn),
            "indeed" => Ok(SourceKind::Indeed),
            "glassdoor" => Ok(SourceKind::Glassdoor),
            "stepstone" => Ok(SourceKind::StepStone),
            _ => Err(format!("Unknown source: {}", s)),
        }
    }
}

/// How a page number becomes the `{offset}` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// The page number itself.
    PageNumber,
    /// `page * page_size` items into the result list.
    ItemOffset { page_size: u32 },
}

impl Pagination {
    pub fn offset(&self, page: u32) -> u32 {
        match self {
            Pagination::PageNumber => page,
            Pagination::ItemOffset { page_size } => page * page_size,
        }
    }
}

/// Whether a harvest needs explicit query values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPolicy {
    /// Missing or blank `job_title`/`location` is a validation error.
    Required,
    /// Missing or blank values fall back to [`DEFAULT_JOB_TITLE`] and
    /// [`DEFAULT_LOCATION`].
    Defaulted,
}

pub const DEFAULT_JOB_TITLE: &str = "developer";
pub const DEFAULT_LOCATION: &str = "germany";

/// One page to fetch during a harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub source: SourceKind,
    pub page: u32,
    /// Absolute URL of the job board page (not the proxy URL).
    pub url: String,
    /// Route through the proxy's premium pool.
    pub premium: bool,
}

/// Static description of a job board.
#[derive(Debug)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    /// Page URL with `{title}`, `{location}` and `{offset}` placeholders.
    pub url_template: &'static str,
    pub pagination: Pagination,
    pub first_page: u32,
    pub last_page: u32,
    /// Base for resolving relative listing links.
    pub base_url: &'static str,
    pub persistence: PersistenceMode,
    pub query_policy: QueryPolicy,
    pub premium_proxy: bool,
    pub layout: Layout,
}

impl SourceDescriptor {
    /// Resolve caller-supplied query values according to this source's policy.
    pub fn resolve_query(
        &self,
        job_title: Option<&str>,
        location: Option<&str>,
    ) -> Result<SearchQuery, AppError> {
        let job_title = non_blank(job_title);
        let location = non_blank(location);

        match self.query_policy {
            QueryPolicy::Required => match (job_title, location) {
                (Some(job_title), Some(location)) => Ok(SearchQuery::new(job_title, location)),
                _ => Err(AppError::ValidationError(format!(
                    "job_title and location are required for {}",
                    self.kind
                ))),
            },
            QueryPolicy::Defaulted => Ok(SearchQuery::new(
                job_title.unwrap_or(DEFAULT_JOB_TITLE),
                location.unwrap_or(DEFAULT_LOCATION),
            )),
        }
    }

    /// Plan the fixed page range for this source.
    pub fn plan(&self, query: &SearchQuery) -> Vec<PageRequest> {
        self.plan_pages(query, self.first_page, self.last_page)
    }

    /// Plan an explicit inclusive page range, in page order.
    pub fn plan_pages(&self, query: &SearchQuery, start: u32, end: u32) -> Vec<PageRequest> {
        (start..=end)
            .map(|page| PageRequest {
                source: self.kind,
                page,
                url: self.page_url(query, page),
                premium: self.premium_proxy,
            })
            .collect()
    }

    pub fn page_count(&self) -> usize {
        (self.first_page..=self.last_page).count()
    }

    fn page_url(&self, query: &SearchQuery, page: u32) -> String {
        self.url_template
            .replace("{title}", &encode_component(&query.job_title))
            .replace("{location}", &encode_component(&query.location))
            .replace("{offset}", &self.pagination.offset(page).to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Percent-encode a value for use in either a path segment or a query value.
fn encode_component(value: &str) -> String {
    // form encoding escapes a literal '+' as %2B, so any '+' left is a space.
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

// ---------------------------------------------------------------------------
// Built-in sources
// ---------------------------------------------------------------------------

static LINKEDIN: SourceDescriptor = SourceDescriptor {
    kind: SourceKind::LinkedIn,
    url_template: "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search?keywords={title}&location={location}&start={offset}",
    pagination: Pagination::ItemOffset { page_size: 25 },
    first_page: 0,
    last_page: 39,
    base_url: "https://www.linkedin.com",
    persistence: PersistenceMode::Upsert,
    query_policy: QueryPolicy::Defaulted,
    premium_proxy: false,
    layout: Layout::Cards {
        card: "li",
        fields: &[
            FieldRule::text(Field::Title, "h3.base-search-card__title"),
            FieldRule::text(Field::Company, "h4.base-search-card__subtitle"),
            FieldRule::text(Field::Location, "span.job-search-card__location"),
            FieldRule::attr(Field::Link, "a.base-card__full-link", "href"),
            FieldRule::text(Field::PostedAgo, "time"),
            FieldRule::attr(Field::LogoUrl, "img.artdeco-entity-image", "data-delayed-url"),
        ],
    },
};

static INDEED: SourceDescriptor = SourceDescriptor {
    kind: SourceKind::Indeed,
    url_template: "https://de.indeed.com/jobs?q={title}&l={location}&fromage=last&start={offset}",
    pagination: Pagination::ItemOffset { page_size: 10 },
    first_page: 0,
    last_page: 9,
    base_url: "https://de.indeed.com",
    persistence: PersistenceMode::Upsert,
    query_policy: QueryPolicy::Defaulted,
    premium_proxy: false,
    layout: Layout::Cards {
        card: ".job_seen_beacon",
        fields: &[
            FieldRule::text(Field::Title, "a.jcs-JobTitle"),
            FieldRule::text(Field::Company, "[data-testid='company-name']"),
            FieldRule::text(Field::Location, "[data-testid='text-location']"),
            FieldRule::text(Field::Description, "div.job-snippet"),
            FieldRule::attr(Field::Link, "a.jcs-JobTitle", "href"),
            FieldRule::text(Field::PostedAgo, "span.date"),
            FieldRule::text(Field::Salary, "div.salary-snippet-container"),
            FieldRule::attr(Field::LogoUrl, "img.companyAvatar", "src"),
        ],
    },
};

static GLASSDOOR: SourceDescriptor = SourceDescriptor {
    kind: SourceKind::Glassdoor,
    url_template: "https://www.glassdoor.de/Job/jobs.htm?sc.keyword={title}&locKeyword={location}&p={offset}",
    pagination: Pagination::PageNumber,
    first_page: 1,
    last_page: 3,
    base_url: "https://www.glassdoor.de",
    persistence: PersistenceMode::Replace,
    query_policy: QueryPolicy::Required,
    premium_proxy: true,
    layout: Layout::Cards {
        card: "li[data-test='jobListing']",
        fields: &[
            FieldRule::text(Field::Title, "a.JobCard_jobTitle__GLyJ1"),
            FieldRule::text(Field::Company, "span.EmployerProfile_compactEmployerName__9MGcV"),
            FieldRule::text(Field::Location, "div.JobCard_location__Ds1fM"),
            FieldRule::text(Field::Description, "div.JobCard_jobDescriptionSnippet__yWW8q"),
            FieldRule::attr(Field::Link, "a.JobCard_jobTitle__GLyJ1", "href"),
            FieldRule::text(Field::PostedAgo, "div.JobCard_listingAge__jJsuc").with(&[
                Transform::Replace {
                    from: "T",
                    to: " days",
                },
            ]),
            FieldRule::text(Field::Salary, ".JobCard_salaryEstimate__QpbTW"),
            FieldRule::attr(Field::LogoUrl, "img.avatar-base_Image__2RcF9", "src"),
            FieldRule::text(Field::ApplyStatus, ".JobCard_easyApplyTag__5vlo5").with(&[
                Transform::Replace {
                    from: "Schnell bewerben",
                    to: "Easy Apply",
                },
            ]),
        ],
    },
};

static STEPSTONE: SourceDescriptor = SourceDescriptor {
    kind: SourceKind::StepStone,
    url_template: "https://www.stepstone.de/work/{title}/in-{location}?whereType=autosuggest&radius=30&page={offset}",
    pagination: Pagination::PageNumber,
    first_page: 1,
    last_page: 10,
    base_url: "https://www.stepstone.de",
    persistence: PersistenceMode::Replace,
    query_policy: QueryPolicy::Defaulted,
    premium_proxy: true,
    // No stable card container; fields pair up positionally.
    layout: Layout::Columns {
        fields: &[
            FieldRule::text(Field::Title, "h2.res-1tassqi"),
            FieldRule::text(Field::Company, "span.res-1fad2gj")
                .with(&[Transform::Strip("Show salary")]),
            FieldRule::text(Field::Location, "span.res-1qh7elo")
                .with(&[Transform::Strip("Partially remote")]),
            FieldRule::text(Field::Description, "span.res-jj48go"),
            FieldRule::attr(Field::Link, "a.res-1foik6i", "href"),
            FieldRule::text(Field::PostedAgo, "span.res-9ochkb"),
            FieldRule::text(Field::LogoUrl, "div.res-13wvw69").via(Accessor::NoscriptImage),
        ],
    },
};
