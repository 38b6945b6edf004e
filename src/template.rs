use askama_actix::Template;

const PAGINATOR_LOOK_AHEAD: u64 = 2;

/// Page navigation for list views.
///
/// [1] 2 3 ... 13
/// 1 ... 4 5 [6] 7 8 ... 13
/// 1 ... 11 12 [13]
#[derive(Debug)]
pub struct Paginator {
    /// URL the `page` query parameter is appended to. May carry other
    /// query parameters already.
    pub base_url: String,
    /// 1-based
    pub this_page: u64,
    pub page_count: u64,
}

/// A single entry in the page navigation.
#[derive(Debug, PartialEq, Eq)]
pub struct PageLink {
    pub number: u64,
    pub current: bool,
    /// Renders as an ellipsis instead of a number.
    pub gap: bool,
}

#[derive(Template)]
#[template(path = "util/paginator.html")]
struct PaginatorTemplate<'a> {
    paginator: &'a Paginator,
}

impl Paginator {
    pub fn has_pages(&self) -> bool {
        self.page_count > 1
    }

    pub fn page_url(&self, page: &u64) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{}page={}", self.base_url, sep, page)
    }

    /// First page, the pages around the current one, and the last page,
    /// with gaps where pages are skipped.
    pub fn links(&self) -> Vec<PageLink> {
        let mut links = Vec::new();
        let mut previous = 0;
        for number in 1..=self.page_count {
            let near = number + PAGINATOR_LOOK_AHEAD >= self.this_page
                && number <= self.this_page + PAGINATOR_LOOK_AHEAD;
            if number == 1 || number == self.page_count || near {
                if previous != 0 && number > previous + 1 {
                    links.push(PageLink {
                        number: 0,
                        current: false,
                        gap: true,
                    });
                }
                links.push(PageLink {
                    number,
                    current: number == self.this_page,
                    gap: false,
                });
                previous = number;
            }
        }
        links
    }

    pub fn as_html(&self) -> String {
        if !self.has_pages() {
            return String::new();
        }
        PaginatorTemplate { paginator: self }
            .render()
            .unwrap_or_else(|e| {
                log::error!("paginator render: {}", e);
                "[Paginator Util Error]".to_owned()
            })
    }
}
