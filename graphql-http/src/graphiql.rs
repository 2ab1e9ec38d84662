//! The interactive GraphiQL page.
//!
//! Browsers that prefer HTML get a page that is pre-filled with the query,
//! variables and result of the request that produced it. Editing the query
//! updates the address bar, so the page can be bookmarked and shared.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::response::GraphQlResponse;

/// Everything the page embeds.
#[derive(Debug, Clone, Copy)]
pub struct PageData<'a> {
    pub query: Option<&'a str>,
    pub variables: Option<&'a Map<String, Value>>,
    pub operation_name: Option<&'a str>,
    /// `None` when nothing was executed.
    pub result: Option<&'a GraphQlResponse>,
}

/// Renders the interactive page.
pub trait PageRenderer: Send + Sync {
    fn render(&self, page: &PageData<'_>) -> String;
}

/// Loads GraphiQL from a CDN.
#[derive(Debug, Clone)]
pub struct GraphiQlRenderer {
    version: String,
}

impl Default for GraphiQlRenderer {
    fn default() -> Self {
        Self::with_version(Self::DEFAULT_VERSION)
    }
}

impl GraphiQlRenderer {
    pub const DEFAULT_VERSION: &'static str = "3.8.3";

    #[must_use]
    pub fn with_version(version: &str) -> Self {
        Self {
            version: version.to_owned(),
        }
    }
}

impl PageRenderer for GraphiQlRenderer {
    fn render(&self, page: &PageData<'_>) -> String {
        let query = script_json(&page.query);
        let variables = script_json(&page.variables.and_then(pretty));
        let result = script_json(&page.result.and_then(pretty));
        let operation_name = script_json(&page.operation_name);
        let version = &self.version;

        format!(
            r#"<!--
The request to this GraphQL server provided the header "Accept: text/html"
and as a result has been presented GraphiQL - an in-browser IDE for
exploring GraphQL.

If you wish to receive JSON, provide the header "Accept: application/json" or
add "&raw" to the end of the URL within a browser.
-->
<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <title>GraphiQL</title>
  <meta name="robots" content="noindex" />
  <meta name="referrer" content="origin" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <style>
    body {{ margin: 0; overflow: hidden; }}
    #graphiql {{ height: 100vh; }}
  </style>
  <link href="https://unpkg.com/graphiql@{version}/graphiql.min.css" rel="stylesheet" />
  <script src="https://unpkg.com/react@18/umd/react.production.min.js"></script>
  <script src="https://unpkg.com/react-dom@18/umd/react-dom.production.min.js"></script>
  <script src="https://unpkg.com/graphiql@{version}/graphiql.min.js"></script>
</head>
<body>
  <div id="graphiql">Loading...</div>
  <script>
    var parameters = {{}};
    window.location.search.substr(1).split('&').forEach(function (entry) {{
      var eq = entry.indexOf('=');
      if (eq >= 0) {{
        parameters[decodeURIComponent(entry.slice(0, eq))] =
          decodeURIComponent(entry.slice(eq + 1).replace(/\+/g, ' '));
      }}
    }});

    function locationQuery(params) {{
      return '?' + Object.keys(params).filter(function (key) {{
        return Boolean(params[key]);
      }}).map(function (key) {{
        return encodeURIComponent(key) + '=' + encodeURIComponent(params[key]);
      }}).join('&');
    }}

    var graphqlParamNames = {{ query: true, variables: true, operationName: true }};
    var otherParams = {{}};
    for (var k in parameters) {{
      if (parameters.hasOwnProperty(k) && graphqlParamNames[k] !== true) {{
        otherParams[k] = parameters[k];
      }}
    }}
    var fetchURL = locationQuery(otherParams);

    function graphQLFetcher(graphQLParams) {{
      return fetch(fetchURL, {{
        method: 'post',
        headers: {{ 'Accept': 'application/json', 'Content-Type': 'application/json' }},
        body: JSON.stringify(graphQLParams),
        credentials: 'include',
      }}).then(function (response) {{
        return response.json();
      }});
    }}

    function updateURL() {{
      history.replaceState(null, null, locationQuery(parameters));
    }}

    function onEditQuery(newQuery) {{
      parameters.query = newQuery;
      updateURL();
    }}

    function onEditVariables(newVariables) {{
      parameters.variables = newVariables;
      updateURL();
    }}

    function onEditOperationName(newOperationName) {{
      parameters.operationName = newOperationName;
      updateURL();
    }}

    ReactDOM.createRoot(document.getElementById('graphiql')).render(
      React.createElement(GraphiQL, {{
        fetcher: graphQLFetcher,
        onEditQuery: onEditQuery,
        onEditVariables: onEditVariables,
        onEditOperationName: onEditOperationName,
        query: {query},
        response: {result},
        variables: {variables},
        operationName: {operation_name},
      }})
    );
  </script>
</body>
</html>"#
        )
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    serde_json::to_string_pretty(value).ok()
}

/// JSON that is safe to place inside a `<script>` element.
///
/// Absent values become `undefined` so GraphiQL falls back to its defaults.
fn script_json<T: Serialize>(value: &Option<T>) -> String {
    value
        .as_ref()
        .and_then(|value| serde_json::to_string(value).ok())
        .map_or_else(|| "undefined".to_owned(), |json| json.replace('/', "\\/"))
}
