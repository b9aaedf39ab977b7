//! Embedded volume terminal dashboard
//!
//! One static page: candle chart and volume heatmap panels are labeled
//! placeholders, the volume-delta widget polls the stats endpoint on the
//! configured interval and renders totals, the live/playback badge and the
//! server-computed sparkline path.

/// Values substituted into the page template
#[derive(Debug, Clone)]
pub struct DashboardContext {
    /// Instrument shown in the widget
    pub symbol: String,
    /// Bar granularity shown in the widget
    pub timeframe: String,
    /// Display window label
    pub range: String,
    /// Widget polling interval in milliseconds
    pub refresh_ms: u64,
}

/// Render the dashboard page for one widget configuration
#[must_use]
pub fn render_dashboard(ctx: &DashboardContext) -> String {
    DASHBOARD_HTML
        .replace("{{symbol}}", &ctx.symbol)
        .replace("{{timeframe}}", &ctx.timeframe)
        .replace("{{range}}", &ctx.range)
        .replace("{{refresh_ms}}", &ctx.refresh_ms.to_string())
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <title>{{symbol}} Volume Terminal</title>
    <style>
        body {
            font-family: monospace;
            background: #111827;
            color: #d1d5db;
            padding: 20px;
            margin: 0;
        }
        h1 {
            font-size: 16px;
            color: #9ca3af;
        }
        .layout {
            display: grid;
            grid-template-columns: 2fr 1fr;
            gap: 16px;
        }
        .panel {
            background: #1f2937;
            border: 1px solid #374151;
            border-radius: 6px;
            padding: 16px;
        }
        .placeholder {
            display: flex;
            align-items: center;
            justify-content: center;
            height: 180px;
            color: #4b5563;
            font-size: 12px;
            border: 1px dashed #374151;
            border-radius: 4px;
        }
        .widget-header {
            display: flex;
            justify-content: space-between;
            font-size: 12px;
            color: #9ca3af;
            margin-bottom: 8px;
        }
        .badge { font-size: 11px; }
        .badge.live { color: #4ade80; }
        .badge.playback { color: #facc15; }
        .total { font-size: 30px; font-weight: bold; margin: 4px 0; }
        .total.positive { color: #4ade80; }
        .total.negative { color: #f87171; }
        .total.flat { color: #9ca3af; }
        .detail { font-size: 11px; color: #6b7280; margin-bottom: 8px; }
        .error-box {
            background: rgba(248, 113, 113, 0.1);
            border: 1px solid rgba(248, 113, 113, 0.4);
            border-radius: 4px;
            color: #f87171;
            font-size: 11px;
            padding: 8px;
            margin-bottom: 8px;
            display: none;
        }
        .error-box button {
            background: none;
            border: none;
            color: #f87171;
            float: right;
            cursor: pointer;
        }
        svg { width: 100%; height: 36px; }
    </style>
</head>
<body>
    <h1>{{symbol}} Volume Terminal</h1>
    <div class="layout">
        <div>
            <div class="panel">
                <div class="widget-header">Candles</div>
                <div class="placeholder">Coming Soon: Candle Chart</div>
            </div>
            <div class="panel" style="margin-top: 16px">
                <div class="widget-header">Volume Heatmap</div>
                <div class="placeholder">Coming Soon: Volume Distribution Heatmap</div>
            </div>
        </div>
        <div class="panel">
            <div class="widget-header">
                <span>{{symbol}} Volume Delta</span>
                <span>{{timeframe}} &middot; {{range}} &middot; <span id="badge" class="badge playback">...</span></span>
            </div>
            <div id="error" class="error-box">
                <button onclick="dismissError()">&times;</button>
                <span id="error-text"></span>
            </div>
            <div id="total" class="total flat">0</div>
            <div class="detail">
                Avg: <span id="avg">0</span> | Bars: <span id="bars">0</span>
            </div>
            <svg viewBox="0 0 100 30" preserveAspectRatio="none">
                <path id="spark" fill="none" stroke="#9ca3af" stroke-width="2" vector-effect="non-scaling-stroke" d="" />
            </svg>
            <div class="detail">Last update: <span id="updated">no data</span></div>
        </div>
    </div>
    <script>
        const fmt = (n) => (n > 0 ? '+' : '') + Math.round(n).toLocaleString();

        function dismissError() {
            document.getElementById('error').style.display = 'none';
        }

        function render(stats) {
            const total = document.getElementById('total');
            total.textContent = fmt(stats.total_delta);
            total.className = 'total ' + (stats.total_delta > 0 ? 'positive'
                : stats.total_delta < 0 ? 'negative' : 'flat');

            document.getElementById('avg').textContent = fmt(stats.avg_delta);
            document.getElementById('bars').textContent = stats.bar_count;
            document.getElementById('updated').textContent =
                stats.last_update ? new Date(stats.last_update).toLocaleTimeString() : 'no data';

            const badge = document.getElementById('badge');
            badge.textContent = stats.is_live ? 'Live' : 'Playback (' + stats.data_source + ')';
            badge.className = 'badge ' + (stats.is_live ? 'live' : 'playback');

            const spark = document.getElementById('spark');
            spark.setAttribute('d', stats.sparkline_path);
            spark.setAttribute('stroke', stats.total_delta > 0 ? '#4ade80'
                : stats.total_delta < 0 ? '#f87171' : '#9ca3af');
        }

        async function refresh() {
            try {
                const response = await fetch('/api/volume/stats');
                const body = await response.json();
                if (!response.ok) {
                    throw new Error((body.errors || [body.error]).join(', '));
                }
                render(body);
            } catch (err) {
                document.getElementById('error-text').textContent = err.message;
                document.getElementById('error').style.display = 'block';
            }
        }

        refresh();
        setInterval(refresh, {{refresh_ms}});
    </script>
</body>
</html>
"##;
