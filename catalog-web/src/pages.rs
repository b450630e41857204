use catalog_core::{CollectionSet, UploadPolicy};

pub fn index_html(collections: &CollectionSet, policy: &UploadPolicy) -> String {
    let options = collections
        .iter()
        .map(|c| {
            format!(
                r#"<option value="{id}">{title}</option>"#,
                id = html_escape(&c.id),
                title = html_escape(&c.title),
            )
        })
        .collect::<Vec<_>>()
        .join("\n                ");

    let accept = policy
        .allowed_extensions()
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Catalogue - Administration</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            max-width: 800px;
            margin: 60px auto;
            padding: 20px;
            color: #333;
        }}
        h1 {{
            font-weight: 300;
        }}
        form {{
            display: flex;
            gap: 10px;
            margin: 20px 0;
        }}
        code {{
            background: #f5f5f5;
            padding: 2px 6px;
            border-radius: 4px;
        }}
    </style>
</head>
<body>
    <h1>Catalogue</h1>
    <form action="/api/upload" method="post" enctype="multipart/form-data">
        <select name="collection">
                {options}
        </select>
        <input type="file" name="file" accept="{accept}">
        <button type="submit">Upload</button>
    </form>
    <ul>
        <li><code>GET /api/scan</code></li>
        <li><code>POST /api/upload</code></li>
        <li><code>POST /api/replace</code></li>
        <li><code>POST /api/delete</code></li>
        <li><a href="/api/generate-json"><code>GET /api/generate-json</code></a></li>
        <li><a href="/api/health"><code>GET /api/health</code></a></li>
    </ul>
</body>
</html>"#,
        options = options,
        accept = accept,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
